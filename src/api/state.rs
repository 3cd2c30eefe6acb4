use crate::application::GameService;
use crate::infrastructure::persistence::InMemoryRoomStore;
use crate::infrastructure::transport::ChannelTransport;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GameService>,
    /// Concrete transport so connections can subscribe to room channels.
    pub transport: Arc<ChannelTransport>,
    pub rooms: Arc<InMemoryRoomStore>,
}
