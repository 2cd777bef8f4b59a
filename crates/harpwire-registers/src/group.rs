use std::collections::HashMap;

use harpwire_frame::Frame;

use crate::descriptor::RegisterDescriptor;
use crate::error::Result;
use crate::map::resolve;

/// Frames for a single register, in arrival order.
#[derive(Debug)]
pub struct RegisterGroup {
    pub descriptor: &'static RegisterDescriptor,
    pub frames: Vec<Frame>,
}

/// Partition frames by register address, preserving first-seen order of the
/// registers and arrival order within each group.
///
/// Fails on the first frame whose address is not in the register map; no
/// partial result is returned.
pub fn group_by_register(frames: impl IntoIterator<Item = Frame>) -> Result<Vec<RegisterGroup>> {
    let mut groups: Vec<RegisterGroup> = Vec::new();
    let mut index: HashMap<u8, usize> = HashMap::new();

    for frame in frames {
        let slot = match index.get(&frame.address) {
            Some(&slot) => slot,
            None => {
                let descriptor = resolve(frame.address)?;
                index.insert(frame.address, groups.len());
                groups.push(RegisterGroup {
                    descriptor,
                    frames: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[slot].frames.push(frame);
    }
    Ok(groups)
}
