use anyhow::Result;
use builtin_interfaces::msg::Time as TimeMsg;
use geometry_msgs::msg::{Quaternion, Transform, TransformStamped, Vector3};
use rclrs::*;
use tf2_msgs::msg::TFMessage;

pub const TF_STATIC_TOPIC: &str = "/tf_static";

/// Publishes static frame relations the way tf2 expects them: one latched
/// message holding every static transform this node has ever sent.
pub struct StaticTransformBroadcaster {
    publisher: Publisher<TFMessage>,
    transforms: Vec<TransformStamped>,
}

impl StaticTransformBroadcaster {
    pub fn new(node: &Node) -> Result<Self, RclrsError> {
        let publisher = node.create_publisher::<TFMessage>(
            TF_STATIC_TOPIC
                .reliable()
                .durability(QoSDurabilityPolicy::TransientLocal)
                .keep_last(1),
        )?;

        Ok(Self {
            publisher,
            transforms: Vec::new(),
        })
    }

    pub fn send_transform(&mut self, transform: TransformStamped) -> Result<()> {
        self.send_transforms(vec![transform])
    }

    pub fn send_transforms(&mut self, transforms: Vec<TransformStamped>) -> Result<()> {
        for transform in transforms {
            merge_transform(&mut self.transforms, transform);
        }

        let msg = TFMessage {
            transforms: self.transforms.clone(),
        };
        self.publisher.publish(&msg)?;

        tracing::debug!(count = self.transforms.len(), "static transforms published");
        Ok(())
    }
}

/// Insert `transform`, replacing any earlier entry for the same child frame.
pub fn merge_transform(transforms: &mut Vec<TransformStamped>, transform: TransformStamped) {
    match transforms
        .iter_mut()
        .find(|existing| existing.child_frame_id == transform.child_frame_id)
    {
        Some(existing) => *existing = transform,
        None => transforms.push(transform),
    }
}

pub fn identity_transform(parent: &str, child: &str, stamp: TimeMsg) -> TransformStamped {
    let mut tf = TransformStamped::default();
    tf.header.stamp = stamp;
    tf.header.frame_id = parent.to_string();
    tf.child_frame_id = child.to_string();
    tf.transform = Transform {
        translation: Vector3 {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        },
        rotation: Quaternion {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        },
    };
    tf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp() -> TimeMsg {
        TimeMsg { sec: 3, nanosec: 7 }
    }

    #[test]
    fn identity_has_no_offset_and_unit_rotation() {
        let tf = identity_transform("world", "base", stamp());
        assert_eq!(tf.header.frame_id, "world");
        assert_eq!(tf.child_frame_id, "base");
        assert_eq!(tf.header.stamp, stamp());
        assert_eq!(tf.transform.translation.x, 0.0);
        assert_eq!(tf.transform.translation.y, 0.0);
        assert_eq!(tf.transform.translation.z, 0.0);
        assert_eq!(tf.transform.rotation.w, 1.0);
        assert_eq!(tf.transform.rotation.x, 0.0);
    }

    #[test]
    fn one_entry_per_child_frame() {
        let mut transforms = Vec::new();
        merge_transform(&mut transforms, identity_transform("world", "base", stamp()));
        merge_transform(&mut transforms, identity_transform("base", "tool", stamp()));

        let mut moved = identity_transform("world", "base", stamp());
        moved.transform.translation.z = 1.5;
        merge_transform(&mut transforms, moved);

        assert_eq!(transforms.len(), 2);
        assert_eq!(transforms[0].child_frame_id, "base");
        assert_eq!(transforms[0].transform.translation.z, 1.5);
        assert_eq!(transforms[1].child_frame_id, "tool");
    }
}
