use crate::room::{Room, RoomCommand};
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use watchparty_core::RoomId;

/// Lazily spawns one [`Room`] task per room id and hands out its command sender.
///
/// Rooms are never reclaimed: an emptied room stays registered with its last playback
/// state and media so a later joiner can pick them up.
#[derive(Clone)]
pub struct RoomManager {
    rooms: Arc<DashMap<RoomId, mpsc::Sender<RoomCommand>>>,
    signaling: Arc<dyn SignalingOutput>,
    channel_capacity: usize,
}

impl RoomManager {
    pub fn new(signaling: Arc<dyn SignalingOutput>, channel_capacity: usize) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            signaling,
            channel_capacity: channel_capacity.max(1),
        }
    }

    pub fn get_room_sender(&self, room_id: &RoomId) -> mpsc::Sender<RoomCommand> {
        if let Some(sender) = self.rooms.get(room_id) {
            return sender.clone();
        }

        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                info!("Creating new room: {}", room_id);
                let (tx, rx) = mpsc::channel(self.channel_capacity);
                let room = Room::new(room_id.clone(), rx, self.signaling.clone());
                tokio::spawn(room.run());
                tx
            })
            .clone()
    }

    pub async fn dispatch(&self, room_id: &RoomId, cmd: RoomCommand) {
        let sender = self.get_room_sender(room_id);
        if let Err(e) = sender.send(cmd).await {
            error!("Room '{}' died: {}", room_id, e);
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
