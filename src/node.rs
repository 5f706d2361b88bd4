// ================================
// src/node.rs - ROS2 node: static frame, finger markers, interactive handle
// ================================
use anyhow::{Error, Result};
use geometry_msgs::msg::Quaternion;
use rclrs::*;
use std::sync::{Arc, Mutex, PoisonError};
use visualization_msgs::msg::{InteractiveMarker, InteractiveMarkerControl, InteractiveMarkerFeedback, Marker};

use crate::{
    config::GripperConfig,
    fingers::{GripperFingers, MARKER_SPHERE},
    interactive::{InteractiveMarkerServer, KeepAlive, CONTROL_NONE, CONTROL_ROTATE_AXIS},
    stamp,
    tf_static::{identity_transform, StaticTransformBroadcaster},
};

const MARKER_QUEUE_DEPTH: usize = 10;
const HANDLE_DESCRIPTION: &str = "Move to open/close the gripper";
const ROTATE_CONTROL_NAME: &str = "move";

#[allow(dead_code)]
pub struct GripperNode {
    node: Node,
    tf_broadcaster: StaticTransformBroadcaster,
    marker_publisher: Publisher<Marker>,
    server: InteractiveMarkerServer,
    fingers: Arc<Mutex<GripperFingers>>,
}

impl GripperNode {
    pub fn new(executor: &Executor, config: &GripperConfig) -> Result<Self> {
        let node = executor.create_node(config.node_name.as_str())?;
        let clock = node.get_clock();

        // world -> base, sent once and latched
        let mut tf_broadcaster = StaticTransformBroadcaster::new(&node)?;
        tf_broadcaster.send_transform(identity_transform(
            &config.parent_frame,
            &config.base_frame,
            stamp::now(&clock),
        ))?;

        let marker_publisher = node.create_publisher::<Marker>(
            config.marker_topic.as_str().keep_last(MARKER_QUEUE_DEPTH),
        )?;

        let fingers = GripperFingers::new(config, stamp::now(&clock));
        Self::publish_fingers(&marker_publisher, &fingers)?;
        let fingers = Arc::new(Mutex::new(fingers));

        let server = InteractiveMarkerServer::new(&node, &config.server_namespace)?;

        let publisher_clone = marker_publisher.clone();
        let fingers_clone = fingers.clone();
        server.insert(
            gripper_handle(config),
            move |feedback: &InteractiveMarkerFeedback| {
                tracing::info!(
                    marker = %feedback.marker_name,
                    event = feedback.event_type,
                    "gripper feedback received"
                );
                if let Err(e) =
                    Self::feedback_callback(feedback, &publisher_clone, &fingers_clone, &clock)
                {
                    tracing::error!("Error during feedback process: {}", e);
                }
                tracing::info!("gripper feedback handled");
            },
        );
        server.apply_changes()?;

        tracing::info!(
            node = %node.fully_qualified_name(),
            marker_topic = %config.marker_topic,
            server = %server.namespace(),
            "gripper node initialized"
        );

        Ok(Self {
            node,
            tf_broadcaster,
            marker_publisher,
            server,
            fingers,
        })
    }

    pub fn keep_alive(&self) -> KeepAlive {
        self.server.keep_alive()
    }

    fn feedback_callback(
        feedback: &InteractiveMarkerFeedback,
        marker_publisher: &Publisher<Marker>,
        fingers: &Arc<Mutex<GripperFingers>>,
        clock: &Clock,
    ) -> Result<(), Error> {
        let markers = fingers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_feedback(feedback, stamp::now(clock));

        for marker in &markers {
            marker_publisher.publish(marker)?;
        }
        tracing::debug!(
            w = feedback.pose.orientation.w,
            finger_a_x = markers[0].pose.position.x,
            finger_b_x = markers[1].pose.position.x,
            "fingers moved"
        );
        Ok(())
    }

    fn publish_fingers(
        marker_publisher: &Publisher<Marker>,
        fingers: &GripperFingers,
    ) -> Result<(), Error> {
        for marker in fingers.to_markers() {
            marker_publisher.publish(&marker)?;
        }
        Ok(())
    }
}

/// The interactive marker RViz draws at the base: a red sphere to grab and a
/// ring that rotates about the control's axis.
pub fn gripper_handle(config: &GripperConfig) -> InteractiveMarker {
    let mut int_marker = InteractiveMarker::default();
    int_marker.header.frame_id = config.base_frame.clone();
    int_marker.name = config.marker_name.clone();
    int_marker.description = HANDLE_DESCRIPTION.to_string();
    int_marker.scale = 1.0;
    int_marker.pose.orientation = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.707,
        w: 0.707,
    };

    let mut sphere = Marker::default();
    sphere.type_ = MARKER_SPHERE;
    sphere.scale.x = 0.5;
    sphere.scale.y = 0.5;
    sphere.scale.z = 0.5;
    sphere.color.r = 1.0;
    sphere.color.g = 0.0;
    sphere.color.b = 0.0;
    sphere.color.a = 1.0;

    let mut sphere_control = InteractiveMarkerControl::default();
    sphere_control.always_visible = true;
    sphere_control.interaction_mode = CONTROL_NONE;
    sphere_control.markers.push(sphere);
    int_marker.controls.push(sphere_control);

    let mut rotate_control = InteractiveMarkerControl::default();
    rotate_control.name = ROTATE_CONTROL_NAME.to_string();
    rotate_control.interaction_mode = CONTROL_ROTATE_AXIS;
    int_marker.controls.push(rotate_control);

    int_marker
}
