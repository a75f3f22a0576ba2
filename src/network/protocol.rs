// ============================================
// Protocol - Бинарный протокол синхронизации
// ============================================
// Кадр: u32 LE длина + тело.
// Тело клиента: u8 вид сообщения + bincode(payload) этого вида.
// Тело сервера: bincode(ServerMessage).
// bincode: фиксированные int, little-endian, лишние байты = ошибка.

use std::io::{self, Read, Write};

use bincode::Options;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blocks::Material;
use crate::control::{ControlState, Mode};
use crate::template::{Mirror, Rotation};
use crate::world::BlockPos;

use super::{Notice, Severity};

/// Предел размера одного кадра
pub const MAX_FRAME_LEN: usize = 1 << 20;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection i/o: {0}")]
    Io(#[from] io::Error),
    #[error("frame is truncated")]
    Truncated,
    #[error("frame of {0} bytes exceeds the limit")]
    Oversized(usize),
    #[error("unknown message kind {0}")]
    UnknownKind(u8),
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl From<bincode::Error> for ProtocolError {
    fn from(e: bincode::Error) -> Self {
        ProtocolError::Malformed(e.to_string())
    }
}

fn wire() -> impl Options + Copy {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(MAX_FRAME_LEN as u64)
        .reject_trailing_bytes()
}

// ============================================
// Сообщения
// ============================================

/// Снимок состояния + флаги действия
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMessage {
    pub anchor: BlockPos,
    pub state: ControlState,
    pub perform_action: bool,
    pub preview_only: bool,
}

/// Клиент -> сервер
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Hello { name: String },
    ControlSync(CommandMessage),
    Measure { first: BlockPos, second: BlockPos },
    WandFill { first: BlockPos, second: BlockPos, material: Material },
    PlaceControl { pos: BlockPos },
    RemoveControl { pos: BlockPos },
}

/// Закрытый список видов сообщений (значение = байт на проводе)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Hello = 0,
    ControlSync = 1,
    Measure = 2,
    WandFill = 3,
    PlaceControl = 4,
    RemoveControl = 5,
}

impl MessageKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        DECODERS.get(tag as usize).map(|entry| entry.kind)
    }

    /// Меняет ли сообщение мир (нужны права оператора)
    pub fn is_editing(self) -> bool {
        !matches!(self, MessageKind::Hello | MessageKind::Measure)
    }
}

impl ClientMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            ClientMessage::Hello { .. } => MessageKind::Hello,
            ClientMessage::ControlSync(_) => MessageKind::ControlSync,
            ClientMessage::Measure { .. } => MessageKind::Measure,
            ClientMessage::WandFill { .. } => MessageKind::WandFill,
            ClientMessage::PlaceControl { .. } => MessageKind::PlaceControl,
            ClientMessage::RemoveControl { .. } => MessageKind::RemoveControl,
        }
    }

    /// Тело кадра: вид + payload
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut body = vec![self.kind().tag()];
        let payload = match self {
            ClientMessage::Hello { name } => wire().serialize(&HelloPayload { name: name.clone() })?,
            ClientMessage::ControlSync(command) => wire().serialize(&ControlSyncPayload::from(command))?,
            ClientMessage::Measure { first, second } => wire().serialize(&CornersPayload {
                first: *first,
                second: *second,
            })?,
            ClientMessage::WandFill { first, second, material } => wire().serialize(&WandFillPayload {
                first: *first,
                second: *second,
                material: material.to_string(),
            })?,
            ClientMessage::PlaceControl { pos } | ClientMessage::RemoveControl { pos } => {
                wire().serialize(pos)?
            }
        };
        body.extend_from_slice(&payload);
        Ok(body)
    }

    /// Разобрать тело кадра через таблицу декодеров
    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        let (&tag, payload) = body.split_first().ok_or(ProtocolError::Truncated)?;
        let entry = DECODERS
            .get(tag as usize)
            .ok_or(ProtocolError::UnknownKind(tag))?;
        (entry.decode)(payload)
    }
}

/// Сервер -> клиент
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    Welcome { operator: bool },
    Notice { severity: Severity, text: String },
    ControlSnapshot { anchor: BlockPos, state: ControlWire },
    ControlRemoved { anchor: BlockPos },
}

impl ServerMessage {
    pub fn notice(notice: &Notice) -> Self {
        ServerMessage::Notice {
            severity: notice.severity(),
            text: notice.to_string(),
        }
    }

    pub fn snapshot(anchor: BlockPos, state: &ControlState) -> Self {
        ServerMessage::ControlSnapshot {
            anchor,
            state: ControlWire::from(state),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(wire().serialize(self)?)
    }

    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        Ok(wire().deserialize(body)?)
    }
}

// ============================================
// Payload
// ============================================

/// Состояние блока на проводе. Порядок полей = порядок байтов
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlWire {
    pub offset: BlockPos,
    pub size: BlockPos,
    pub mode: Mode,
    /// `id[prop=val,...]`, пусто = нет материала
    pub filler: String,
    /// Пусто = нет имени
    pub template_name: String,
    pub rotation: Rotation,
    pub mirror: Mirror,
}

impl From<&ControlState> for ControlWire {
    fn from(state: &ControlState) -> Self {
        Self {
            offset: state.offset,
            size: state.size,
            mode: state.mode,
            filler: state.filler.as_ref().map(ToString::to_string).unwrap_or_default(),
            template_name: state.template_name.clone().unwrap_or_default(),
            rotation: state.rotation,
            mirror: state.mirror,
        }
    }
}

impl From<ControlWire> for ControlState {
    fn from(wire: ControlWire) -> Self {
        let mut state = ControlState {
            mode: wire.mode,
            size: wire.size,
            offset: wire.offset,
            filler: Material::parse_lenient(&wire.filler),
            template_name: None,
            rotation: wire.rotation,
            mirror: wire.mirror,
        };
        state.set_template_name(&wire.template_name);
        state
    }
}

#[derive(Serialize, Deserialize)]
struct HelloPayload {
    name: String,
}

#[derive(Serialize, Deserialize)]
struct ControlSyncPayload {
    anchor: BlockPos,
    state: ControlWire,
    perform_action: bool,
    preview_only: bool,
}

impl From<&CommandMessage> for ControlSyncPayload {
    fn from(command: &CommandMessage) -> Self {
        Self {
            anchor: command.anchor,
            state: ControlWire::from(&command.state),
            perform_action: command.perform_action,
            preview_only: command.preview_only,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CornersPayload {
    first: BlockPos,
    second: BlockPos,
}

#[derive(Serialize, Deserialize)]
struct WandFillPayload {
    first: BlockPos,
    second: BlockPos,
    material: String,
}

// ============================================
// Таблица декодеров
// ============================================

type DecodeFn = fn(&[u8]) -> Result<ClientMessage, ProtocolError>;

struct Decoder {
    kind: MessageKind,
    decode: DecodeFn,
}

/// Индекс в таблице = байт вида сообщения
static DECODERS: [Decoder; 6] = [
    Decoder { kind: MessageKind::Hello, decode: decode_hello },
    Decoder { kind: MessageKind::ControlSync, decode: decode_control_sync },
    Decoder { kind: MessageKind::Measure, decode: decode_measure },
    Decoder { kind: MessageKind::WandFill, decode: decode_wand_fill },
    Decoder { kind: MessageKind::PlaceControl, decode: decode_place_control },
    Decoder { kind: MessageKind::RemoveControl, decode: decode_remove_control },
];

fn decode_hello(payload: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let HelloPayload { name } = wire().deserialize(payload)?;
    Ok(ClientMessage::Hello { name })
}

fn decode_control_sync(payload: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let p: ControlSyncPayload = wire().deserialize(payload)?;
    Ok(ClientMessage::ControlSync(CommandMessage {
        anchor: p.anchor,
        state: p.state.into(),
        perform_action: p.perform_action,
        preview_only: p.preview_only,
    }))
}

fn decode_measure(payload: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let CornersPayload { first, second } = wire().deserialize(payload)?;
    Ok(ClientMessage::Measure { first, second })
}

fn decode_wand_fill(payload: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let p: WandFillPayload = wire().deserialize(payload)?;
    let material = Material::parse(&p.material)
        .map_err(|e| ProtocolError::Malformed(format!("material '{}': {}", p.material, e)))?;
    Ok(ClientMessage::WandFill {
        first: p.first,
        second: p.second,
        material,
    })
}

fn decode_place_control(payload: &[u8]) -> Result<ClientMessage, ProtocolError> {
    Ok(ClientMessage::PlaceControl { pos: wire().deserialize(payload)? })
}

fn decode_remove_control(payload: &[u8]) -> Result<ClientMessage, ProtocolError> {
    Ok(ClientMessage::RemoveControl { pos: wire().deserialize(payload)? })
}

// ============================================
// Кадры
// ============================================

pub fn write_frame<W: Write + ?Sized>(writer: &mut W, body: &[u8]) -> Result<(), ProtocolError> {
    if body.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::Oversized(body.len()));
    }
    writer.write_all(&(body.len() as u32).to_le_bytes())?;
    writer.write_all(body)?;
    writer.flush()?;
    Ok(())
}

/// Прочитать кадр. Ok(None) - соединение закрыто между кадрами
pub fn read_frame<R: Read + ?Sized>(reader: &mut R) -> Result<Option<Vec<u8>>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        match reader.read(&mut len_buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(ProtocolError::Truncated),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::Oversized(len));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => ProtocolError::Truncated,
        _ => ProtocolError::Io(e),
    })?;
    Ok(Some(body))
}
