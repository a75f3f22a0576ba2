// ============================================
// Client - Клиент протокола синхронизации
// ============================================

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::blocks::Material;
use crate::control::ControlState;
use crate::world::BlockPos;

use super::{read_frame, write_frame, ClientMessage, CommandMessage, ProtocolError, ServerMessage};

pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let writer = BufWriter::new(stream.try_clone()?);
        log::debug!("[CLIENT] Connected to {}", stream.peer_addr()?);
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
        })
    }

    /// Таймаут чтения; по истечении recv вернёт ошибку ввода-вывода
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), ProtocolError> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    pub fn send(&mut self, message: &ClientMessage) -> Result<(), ProtocolError> {
        let body = message.encode()?;
        write_frame(&mut self.writer, &body)
    }

    pub fn hello(&mut self, name: &str) -> Result<(), ProtocolError> {
        self.send(&ClientMessage::Hello { name: name.to_string() })
    }

    /// Отправить снимок блока управления
    pub fn send_control(
        &mut self,
        anchor: BlockPos,
        state: &ControlState,
        perform_action: bool,
        preview_only: bool,
    ) -> Result<(), ProtocolError> {
        self.send(&ClientMessage::ControlSync(CommandMessage {
            anchor,
            state: state.clone(),
            perform_action,
            preview_only,
        }))
    }

    pub fn measure(&mut self, first: BlockPos, second: BlockPos) -> Result<(), ProtocolError> {
        self.send(&ClientMessage::Measure { first, second })
    }

    pub fn wand_fill(&mut self, first: BlockPos, second: BlockPos, material: &Material) -> Result<(), ProtocolError> {
        self.send(&ClientMessage::WandFill {
            first,
            second,
            material: material.clone(),
        })
    }

    pub fn place_control(&mut self, pos: BlockPos) -> Result<(), ProtocolError> {
        self.send(&ClientMessage::PlaceControl { pos })
    }

    pub fn remove_control(&mut self, pos: BlockPos) -> Result<(), ProtocolError> {
        self.send(&ClientMessage::RemoveControl { pos })
    }

    /// Следующее сообщение сервера. Ok(None) - сервер закрыл соединение
    pub fn recv(&mut self) -> Result<Option<ServerMessage>, ProtocolError> {
        match read_frame(&mut self.reader)? {
            Some(body) => Ok(Some(ServerMessage::decode(&body)?)),
            None => Ok(None),
        }
    }
}
