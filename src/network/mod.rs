// ============================================
// Network - Синхронизация блоков управления
// ============================================
// Протокол кадров, диспетчер сообщений, TCP сервер и клиент

mod client;
mod dispatcher;
mod feedback;
mod protocol;
mod server;

pub use client::Client;
pub use dispatcher::{Dispatch, Dispatcher};
pub use feedback::{Feedback, Notice, Severity};
pub use protocol::{
    read_frame, write_frame, ClientMessage, CommandMessage, ControlWire, MessageKind, ProtocolError,
    ServerMessage, MAX_FRAME_LEN,
};
pub use server::{load_world, ClientId, Event, Server, ServerError, ServerState, ShutdownHandle};
