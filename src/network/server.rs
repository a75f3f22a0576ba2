// ============================================
// Server - TCP сервер синхронизации
// ============================================
// Поток на приём, по два потока на клиента (чтение/запись) и один
// логический поток, который владеет миром. Сообщения клиентов
// применяются строго по одному. Остановка через ShutdownHandle,
// после неё мир сохраняется.

use std::collections::BTreeMap;
use std::io::{self, BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::ServerConfig;
use crate::region::ChunkedFill;
use crate::save::{ControlFile, DiskTemplates, SaveError, WorldFile};
use crate::template::{TemplateStorage, TemplateStore};
use crate::world::{object_types, BlockPos, BlockStorage, World};

use super::{read_frame, write_frame, ClientMessage, Dispatch, Dispatcher, Feedback, Notice, ServerMessage};

/// Как часто приём и логика проверяют флаг остановки
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Save(#[from] SaveError),
}

pub type ClientId = u64;

/// События от сетевых потоков к логическому
#[derive(Debug)]
pub enum Event {
    Connected {
        client: ClientId,
        peer: String,
        outbox: Sender<ServerMessage>,
    },
    Message {
        client: ClientId,
        message: ClientMessage,
    },
    Disconnected {
        client: ClientId,
    },
}

struct Session {
    peer: String,
    name: Option<String>,
    operator: bool,
    outbox: Sender<ServerMessage>,
}

/// Флаг остановки сервера, общий для всех потоков
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Сообщения диспетчера сразу уходят клиенту, не дожидаясь конца действия
struct SessionFeedback {
    client: ClientId,
    outbox: Sender<ServerMessage>,
}

impl Feedback for SessionFeedback {
    fn notify(&mut self, notice: Notice) {
        if self.outbox.send(ServerMessage::notice(&notice)).is_err() {
            log::debug!("[NET] Outbox of client {} is closed", self.client);
        }
    }
}

// ============================================
// Логика
// ============================================

/// Состояние логического потока: мир, сессии, диспетчер
pub struct ServerState<S> {
    config: ServerConfig,
    world: World,
    dispatcher: Dispatcher<S>,
    sessions: BTreeMap<ClientId, Session>,
    /// Правки с момента последнего сохранения
    unsaved_edits: u64,
}

impl<S: TemplateStorage> ServerState<S> {
    pub fn new(config: ServerConfig, world: World, dispatcher: Dispatcher<S>) -> Self {
        Self {
            config,
            world,
            dispatcher,
            sessions: BTreeMap::new(),
            unsaved_edits: 0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn unsaved_edits(&self) -> u64 {
        self.unsaved_edits
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Connected { client, peer, outbox } => {
                log::info!("[NET] Client {} connected from {}", client, peer);
                self.sessions.insert(
                    client,
                    Session {
                        peer,
                        name: None,
                        operator: self.config.operators.is_empty(),
                        outbox,
                    },
                );
            }
            Event::Message { client, message } => self.handle_message(client, message),
            Event::Disconnected { client } => {
                if let Some(session) = self.sessions.remove(&client) {
                    log::info!(
                        "[NET] Client {} ({}) disconnected",
                        client,
                        session.name.as_deref().unwrap_or(&session.peer)
                    );
                }
            }
        }
    }

    fn handle_message(&mut self, client: ClientId, message: ClientMessage) {
        let kind = message.kind();
        let Some(session) = self.sessions.get(&client) else {
            log::debug!("[NET] Message from unknown client {}", client);
            return;
        };

        if let ClientMessage::Hello { name } = message {
            self.greet(client, name);
            return;
        }

        if kind.is_editing() && !session.operator {
            log::warn!(
                "[NET] Client {} ({}) is not an operator, {:?} refused",
                client,
                session.name.as_deref().unwrap_or(&session.peer),
                kind
            );
            self.send(client, ServerMessage::notice(&Notice::PermissionDenied));
            return;
        }

        let removed_at = match &message {
            ClientMessage::RemoveControl { pos } => Some(*pos),
            _ => None,
        };

        let mut feedback = SessionFeedback {
            client,
            outbox: session.outbox.clone(),
        };
        let dispatch = self.dispatcher.handle(&mut self.world, message, &mut feedback);
        if kind.is_editing() && !matches!(dispatch, Dispatch::Ignored) {
            self.unsaved_edits += 1;
        }

        if let (Dispatch::Removed(true), Some(anchor)) = (&dispatch, removed_at) {
            self.broadcast(ServerMessage::ControlRemoved { anchor });
        }
        self.broadcast_dirty();
    }

    /// Hello: запомнить имя, выдать права и текущие блоки управления
    fn greet(&mut self, client: ClientId, name: String) {
        let name = name.trim().to_string();
        let operator = self.config.is_operator(&name);
        if let Some(session) = self.sessions.get_mut(&client) {
            log::info!("[NET] Client {} is '{}' (operator: {})", client, name, operator);
            session.name = Some(name);
            session.operator = operator;
        }

        self.send(client, ServerMessage::Welcome { operator });
        let mut anchors: Vec<BlockPos> = self.world.objects().map(|(pos, _)| pos).collect();
        anchors.sort_unstable();
        for anchor in anchors {
            if let Some(state) = self.world.control(anchor) {
                self.send(client, ServerMessage::snapshot(anchor, state));
            }
        }
    }

    /// Разослать всем изменившиеся блоки управления
    fn broadcast_dirty(&mut self) {
        for anchor in self.world.take_dirty_objects() {
            if let Some(state) = self.world.control(anchor) {
                self.broadcast(ServerMessage::snapshot(anchor, state));
            }
        }
    }

    fn send(&self, client: ClientId, message: ServerMessage) {
        if let Some(session) = self.sessions.get(&client) {
            if session.outbox.send(message).is_err() {
                log::debug!("[NET] Outbox of client {} is closed", client);
            }
        }
    }

    fn broadcast(&self, message: ServerMessage) {
        for (&client, session) in &self.sessions {
            if session.outbox.send(message.clone()).is_err() {
                log::debug!("[NET] Outbox of client {} is closed", client);
            }
        }
    }

    /// Записать воксели и блоки управления на диск
    pub fn save(&mut self) -> Result<(), SaveError> {
        WorldFile::save(&self.config.world_file, &self.world.blocks)?;
        ControlFile::save(&self.config.controls_file, &self.world)?;
        self.unsaved_edits = 0;
        Ok(())
    }

    /// Периодическое сохранение: только если были правки
    pub fn save_if_dirty(&mut self) {
        if self.unsaved_edits == 0 {
            return;
        }
        let edits = self.unsaved_edits;
        match self.save() {
            Ok(()) => log::debug!("[SAVE] Autosave after {} edits", edits),
            Err(e) => log::error!("[SAVE] Autosave failed: {}", e),
        }
    }
}

/// Собрать мир по конфигу. Отсутствующие файлы = пустой мир
pub fn load_world(config: &ServerConfig) -> Result<World, SaveError> {
    let mut world = World::new(BlockStorage::with_limits(
        config.min_height,
        config.max_height,
        config.max_fill_volume,
    ));

    if config.world_file.exists() {
        WorldFile::load(&config.world_file, &mut world.blocks)?;
    } else {
        log::info!("[SERVER] No world file at {}, starting empty", config.world_file.display());
    }
    if config.controls_file.exists() {
        ControlFile::load(&config.controls_file, &mut world, object_types())?;
    }
    Ok(world)
}

// ============================================
// Сеть
// ============================================

pub struct Server {
    listener: TcpListener,
    state: ServerState<DiskTemplates>,
    save_interval: Duration,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Загрузить мир и открыть сокет
    pub fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let world = load_world(&config)?;
        let listener = TcpListener::bind(&config.bind).map_err(|source| ServerError::Bind {
            addr: config.bind.clone(),
            source,
        })?;

        let templates = TemplateStore::new(DiskTemplates::new(&config.template_dir));
        let dispatcher = Dispatcher::new(templates, ChunkedFill::new(config.fill_chunk_edge), object_types());
        let save_interval = Duration::from_secs(config.save_interval_secs.max(1));

        Ok(Self {
            listener,
            state: ServerState::new(config, world, dispatcher),
            save_interval,
            shutdown: ShutdownHandle::default(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Ручка для остановки run() из другого потока
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Блокирующий цикл сервера. Возвращается после запроса остановки,
    /// сохранив мир
    pub fn run(self) -> Result<(), ServerError> {
        let Server {
            listener,
            mut state,
            save_interval,
            shutdown,
        } = self;
        log::info!("[SERVER] Listening on {}", listener.local_addr()?);
        listener.set_nonblocking(true)?;

        let (events, inbox) = mpsc::sync_channel::<Event>(1);
        let accept_shutdown = shutdown.clone();
        let acceptor = thread::spawn(move || accept_loop(listener, events, accept_shutdown));

        run_logic(&mut state, inbox, save_interval, &shutdown);
        shutdown.request();
        if acceptor.join().is_err() {
            log::error!("[NET] Accept thread panicked");
        }

        state.save()?;
        log::info!("[SERVER] Stopped, world saved to {}", state.config.world_file.display());
        Ok(())
    }
}

fn run_logic<S: TemplateStorage>(
    state: &mut ServerState<S>,
    inbox: Receiver<Event>,
    save_interval: Duration,
    shutdown: &ShutdownHandle,
) {
    let mut last_save = Instant::now();
    while !shutdown.is_requested() {
        let timeout = save_interval
            .saturating_sub(last_save.elapsed())
            .min(POLL_INTERVAL);
        match inbox.recv_timeout(timeout) {
            Ok(event) => state.handle_event(event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if last_save.elapsed() >= save_interval {
            state.save_if_dirty();
            last_save = Instant::now();
        }
    }
}

/// Слушатель неблокирующий: между попытками проверяем флаг остановки
fn accept_loop(listener: TcpListener, events: SyncSender<Event>, shutdown: ShutdownHandle) {
    let mut next_client: ClientId = 0;
    while !shutdown.is_requested() {
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(e) = stream.set_nonblocking(false) {
                    log::warn!("[NET] Cannot switch client socket to blocking: {}", e);
                    continue;
                }
                next_client += 1;
                spawn_client(stream, next_client, events.clone());
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                log::warn!("[NET] Accept failed: {}", e);
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
    log::debug!("[NET] Accept loop stopped");
}

fn spawn_client(stream: TcpStream, client: ClientId, events: SyncSender<Event>) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());
    if let Err(e) = stream.set_nodelay(true) {
        log::debug!("[NET] set_nodelay failed for {}: {}", peer, e);
    }

    let writer_stream = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            log::warn!("[NET] Failed to clone stream for {}: {}", peer, e);
            return;
        }
    };

    let (outbox, outgoing) = mpsc::channel::<ServerMessage>();
    if events.send(Event::Connected { client, peer, outbox }).is_err() {
        return;
    }

    // Запись: поток живёт, пока жива сессия (Sender в логическом потоке)
    thread::spawn(move || {
        let mut writer = BufWriter::new(writer_stream);
        while let Ok(message) = outgoing.recv() {
            let body = match message.encode() {
                Ok(body) => body,
                Err(e) => {
                    log::warn!("[NET] Cannot encode message for client {}: {}", client, e);
                    continue;
                }
            };
            if write_frame(&mut writer, &body).is_err() {
                break;
            }
        }
    });

    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        loop {
            match read_frame(&mut reader) {
                Ok(Some(body)) => match ClientMessage::decode(&body) {
                    Ok(message) => {
                        if events.send(Event::Message { client, message }).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::warn!("[NET] Client {} sent a malformed frame: {}", client, e);
                        break;
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    log::warn!("[NET] Read from client {} failed: {}", client, e);
                    break;
                }
            }
        }
        reader.get_ref().shutdown(Shutdown::Both).ok();
        events.send(Event::Disconnected { client }).ok();
    });
}
