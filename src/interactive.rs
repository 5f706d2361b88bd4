// ================================
// src/interactive.rs - interactive marker server (ROS 2 topics used by RViz)
// ================================
//
// <ns>/update                   InteractiveMarkerUpdate   (out)
// <ns>/feedback                 InteractiveMarkerFeedback (in)
// <ns>/get_interactive_markers  GetInteractiveMarkers     (service)
use anyhow::Result;
use rclrs::*;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use visualization_msgs::{
    msg::{InteractiveMarker, InteractiveMarkerFeedback, InteractiveMarkerPose, InteractiveMarkerUpdate},
    srv::{GetInteractiveMarkers, GetInteractiveMarkers_Request, GetInteractiveMarkers_Response},
};

// InteractiveMarkerUpdate.type
pub const UPDATE_KEEP_ALIVE: u8 = 0;
pub const UPDATE_UPDATE: u8 = 1;

// InteractiveMarkerFeedback.event_type
pub const FEEDBACK_POSE_UPDATE: u8 = 1;
pub const FEEDBACK_BUTTON_CLICK: u8 = 3;
pub const FEEDBACK_MOUSE_DOWN: u8 = 4;
pub const FEEDBACK_MOUSE_UP: u8 = 5;

// InteractiveMarkerControl.interaction_mode
pub const CONTROL_NONE: u8 = 0;
pub const CONTROL_ROTATE_AXIS: u8 = 5;

const UPDATE_QUEUE_DEPTH: usize = 100;
const FEEDBACK_QUEUE_DEPTH: usize = 100;

pub type FeedbackHandler = Arc<dyn Fn(&InteractiveMarkerFeedback) + Send + Sync>;

/// What the server has to do for one inbound feedback message.
pub struct FeedbackOutcome {
    pub pose_update: Option<InteractiveMarkerUpdate>,
    pub handler: Option<FeedbackHandler>,
}

/// Marker bookkeeping behind the server topics. Holds no ROS handles.
pub struct ServerState {
    server_id: String,
    seq_num: u64,
    markers: BTreeMap<String, InteractiveMarker>,
    pending: BTreeMap<String, InteractiveMarker>,
    handlers: HashMap<String, FeedbackHandler>,
}

impl ServerState {
    pub fn new(server_id: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            seq_num: 0,
            markers: BTreeMap::new(),
            pending: BTreeMap::new(),
            handlers: HashMap::new(),
        }
    }

    pub fn seq_num(&self) -> u64 {
        self.seq_num
    }

    /// Stage `marker`; it becomes visible to clients on the next [`commit`](Self::commit).
    pub fn insert(&mut self, marker: InteractiveMarker, handler: Option<FeedbackHandler>) {
        if let Some(handler) = handler {
            self.handlers.insert(marker.name.clone(), handler);
        }
        self.pending.insert(marker.name.clone(), marker);
    }

    pub fn get(&self, name: &str) -> Option<&InteractiveMarker> {
        self.markers.get(name)
    }

    /// Move pending markers into the committed set. Returns the update to
    /// publish, or `None` if nothing was pending.
    pub fn commit(&mut self) -> Option<InteractiveMarkerUpdate> {
        if self.pending.is_empty() {
            return None;
        }

        let pending = std::mem::take(&mut self.pending);
        let markers: Vec<InteractiveMarker> = pending.values().cloned().collect();
        self.markers.extend(pending);
        self.seq_num += 1;

        Some(InteractiveMarkerUpdate {
            server_id: self.server_id.clone(),
            seq_num: self.seq_num,
            type_: UPDATE_UPDATE,
            markers,
            poses: Vec::new(),
            erases: Vec::new(),
        })
    }

    /// Route one feedback message. `None` means the marker is unknown and the
    /// message is dropped.
    pub fn process_feedback(&mut self, feedback: &InteractiveMarkerFeedback) -> Option<FeedbackOutcome> {
        let marker = self.markers.get_mut(&feedback.marker_name)?;

        let pose_update = if feedback.event_type == FEEDBACK_POSE_UPDATE {
            if !feedback.header.frame_id.is_empty() {
                marker.header = feedback.header.clone();
            }
            marker.pose = feedback.pose.clone();

            let pose = InteractiveMarkerPose {
                header: marker.header.clone(),
                pose: marker.pose.clone(),
                name: marker.name.clone(),
            };
            self.seq_num += 1;

            Some(InteractiveMarkerUpdate {
                server_id: self.server_id.clone(),
                seq_num: self.seq_num,
                type_: UPDATE_UPDATE,
                markers: Vec::new(),
                poses: vec![pose],
                erases: Vec::new(),
            })
        } else {
            None
        };

        Some(FeedbackOutcome {
            pose_update,
            handler: self.handlers.get(&feedback.marker_name).cloned(),
        })
    }

    pub fn keep_alive(&self) -> InteractiveMarkerUpdate {
        InteractiveMarkerUpdate {
            server_id: self.server_id.clone(),
            seq_num: self.seq_num,
            type_: UPDATE_KEEP_ALIVE,
            ..Default::default()
        }
    }

    pub fn snapshot(&self) -> GetInteractiveMarkers_Response {
        GetInteractiveMarkers_Response {
            sequence_number: self.seq_num,
            markers: self.markers.values().cloned().collect(),
        }
    }
}

fn lock(state: &Mutex<ServerState>) -> MutexGuard<'_, ServerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct InteractiveMarkerServer {
    namespace: String,
    update_publisher: Publisher<InteractiveMarkerUpdate>,
    state: Arc<Mutex<ServerState>>,
    _feedback_subscription: Subscription<InteractiveMarkerFeedback>,
    _marker_service: Service<GetInteractiveMarkers>,
}

impl InteractiveMarkerServer {
    pub fn new(node: &Node, namespace: &str) -> Result<Self, RclrsError> {
        let namespace = namespace.trim_end_matches('/').to_string();
        let state = Arc::new(Mutex::new(ServerState::new(node.fully_qualified_name())));

        let update_topic = format!("{namespace}/update");
        let update_publisher = node.create_publisher::<InteractiveMarkerUpdate>(
            update_topic.as_str().reliable().keep_last(UPDATE_QUEUE_DEPTH),
        )?;

        let feedback_topic = format!("{namespace}/feedback");
        let publisher_clone = update_publisher.clone();
        let state_clone = state.clone();
        let _feedback_subscription = node.create_subscription::<InteractiveMarkerFeedback, _>(
            feedback_topic.as_str().reliable().keep_last(FEEDBACK_QUEUE_DEPTH),
            move |feedback: InteractiveMarkerFeedback| {
                if let Err(e) = Self::feedback_callback(&feedback, &publisher_clone, &state_clone) {
                    tracing::error!("Error during feedback process: {}", e);
                }
            },
        )?;

        let service_name = format!("{namespace}/get_interactive_markers");
        let state_clone = state.clone();
        let _marker_service = node.create_service::<GetInteractiveMarkers, _>(
            service_name.as_str(),
            move |_request: GetInteractiveMarkers_Request| {
                let response = lock(&state_clone).snapshot();
                tracing::debug!(
                    seq_num = response.sequence_number,
                    markers = response.markers.len(),
                    "interactive markers requested"
                );
                response
            },
        )?;

        tracing::info!(namespace = %namespace, "interactive marker server started");

        Ok(Self {
            namespace,
            update_publisher,
            state,
            _feedback_subscription,
            _marker_service,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Stage `marker` and call `handler` for every feedback event on it.
    pub fn insert<F>(&self, marker: InteractiveMarker, handler: F)
    where
        F: Fn(&InteractiveMarkerFeedback) + Send + Sync + 'static,
    {
        lock(&self.state).insert(marker, Some(Arc::new(handler)));
    }

    /// Publish everything staged since the last call.
    pub fn apply_changes(&self) -> Result<()> {
        let update = lock(&self.state).commit();

        if let Some(update) = update {
            self.update_publisher.publish(&update)?;
            tracing::debug!(seq_num = update.seq_num, markers = update.markers.len(), "update published");
        }
        Ok(())
    }

    pub fn keep_alive(&self) -> KeepAlive {
        KeepAlive {
            publisher: self.update_publisher.clone(),
            state: self.state.clone(),
        }
    }

    fn feedback_callback(
        feedback: &InteractiveMarkerFeedback,
        update_publisher: &Publisher<InteractiveMarkerUpdate>,
        state: &Arc<Mutex<ServerState>>,
    ) -> Result<()> {
        // The lock is released before the handler runs so it may call back
        // into the server.
        let outcome = lock(state).process_feedback(feedback);

        let Some(outcome) = outcome else {
            tracing::debug!(marker = %feedback.marker_name, "feedback for unknown marker ignored");
            return Ok(());
        };

        if let Some(update) = outcome.pose_update {
            update_publisher.publish(&update)?;
        }
        if let Some(handler) = outcome.handler {
            handler(feedback);
        }
        Ok(())
    }
}

/// Handle for publishing keep-alive updates from outside the executor.
#[derive(Clone)]
pub struct KeepAlive {
    publisher: Publisher<InteractiveMarkerUpdate>,
    state: Arc<Mutex<ServerState>>,
}

impl KeepAlive {
    pub fn publish(&self) -> Result<()> {
        let update = lock(&self.state).keep_alive();
        self.publisher.publish(&update)?;
        Ok(())
    }
}
