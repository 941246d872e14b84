//! Request/event dispatch around the codec.
//!
//! Message framing, sockets and fd passing live in the embedding layer;
//! this module only maps `(interface, version)` to per-opcode handler
//! tables registered at init, and implements the two core messages the
//! compat layer depends on: `UpdateTypes` and `Error`.

use tracing::debug;

use crate::error::protocol::ProtocolError;
use crate::pod::builder::PodBuilder;
use crate::pod::parser::PodParser;
use crate::pod::types::ids;

use super::type_map::{CompatTypeMap, TYPE_MAP};

/// Защита от враждебного счётчика в `UpdateTypes`.
const MAX_UPDATE_TYPES: usize = 4096;

/// Error identifiers carried over the wire in core `Error` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorId {
    InvalidArgument = 1,
    NoMemory = 2,
    Protocol = 3,
    VersionMismatch = 4,
}

impl ErrorId {
    pub fn from_wire(raw: u32) -> Option<Self> {
        Some(match raw {
            1 => ErrorId::InvalidArgument,
            2 => ErrorId::NoMemory,
            3 => ErrorId::Protocol,
            4 => ErrorId::VersionMismatch,
            _ => return None,
        })
    }
}

/// One incoming message, already framed by the transport.
#[derive(Debug, Clone, Copy)]
pub struct Message<'a> {
    pub object_id: u32,
    pub opcode: u8,
    pub seq: u32,
    pub data: &'a [u8],
}

/// v0 core method opcodes.
pub mod v0_core_method {
    pub const HELLO: u8 = 0;
    pub const UPDATE_TYPES: u8 = 1;
    pub const SYNC: u8 = 2;
    pub const GET_REGISTRY: u8 = 3;
    pub const CLIENT_UPDATE: u8 = 4;
    pub const PERMISSIONS: u8 = 5;
    pub const CREATE_OBJECT: u8 = 6;
    pub const DESTROY: u8 = 7;

    pub const NUM: u8 = 8;
}

/// v0 core event opcodes.
pub mod v0_core_event {
    pub const UPDATE_TYPES: u8 = 0;
    pub const INFO: u8 = 1;
    pub const DONE: u8 = 2;
    pub const ERROR: u8 = 3;
    pub const REMOVE_ID: u8 = 4;

    pub const NUM: u8 = 5;
}

/// Полезная нагрузка сообщения содержит POD-деревья, которые перед
/// обработкой должны пройти перезапись словаря.
pub const DEMARSHAL_REMAP: u32 = 1 << 0;

pub type DemarshalFn = fn(&mut CompatTypeMap, &Message<'_>) -> Result<(), ProtocolError>;

/// Обработчик одного опкода.
pub struct DemarshalEntry {
    pub opcode: u8,
    pub func: DemarshalFn,
    pub flags: u32,
}

/// Таблица одного интерфейса конкретной версии.
pub struct InterfaceMarshal {
    pub interface_type: u32,
    pub version: u32,
    pub n_methods: u8,
    pub n_events: u8,
    pub demarshal: &'static [DemarshalEntry],
}

/// Реестр интерфейсов; заполняется при инициализации, дальше только
/// поиск по `(тип интерфейса, версия)`.
#[derive(Default)]
pub struct MarshalRegistry {
    entries: Vec<InterfaceMarshal>,
}

impl MarshalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, marshal: InterfaceMarshal) {
        self.entries.push(marshal);
    }

    pub fn lookup(&self, interface_type: u32, version: u32) -> Option<&InterfaceMarshal> {
        self.entries
            .iter()
            .find(|m| m.interface_type == interface_type && m.version == version)
    }

    /// Находит обработчик по `(интерфейс, версия, опкод)` и вызывает его.
    pub fn dispatch(
        &self,
        map: &mut CompatTypeMap,
        interface_type: u32,
        version: u32,
        msg: &Message<'_>,
    ) -> Result<(), ProtocolError> {
        let iface = self
            .lookup(interface_type, version)
            .ok_or(ProtocolError::UnknownInterface {
                interface: interface_type,
                version,
            })?;
        let entry = iface
            .demarshal
            .iter()
            .find(|e| e.opcode == msg.opcode)
            .ok_or(ProtocolError::UnknownOpcode {
                interface: interface_type,
                opcode: msg.opcode,
            })?;
        debug!(
            "dispatch object {} opcode {} seq {}",
            msg.object_id, msg.opcode, msg.seq
        );
        (entry.func)(map, msg)
    }
}

/// Demarshals `UpdateTypes`: `(first_id, n_types, n_types × string)`.
///
/// The peer announces its type table at session start; slots are matched
/// to the global table by legacy name.
pub fn core_demarshal_update_types(
    map: &mut CompatTypeMap,
    msg: &Message<'_>,
) -> Result<(), ProtocolError> {
    let mut p = PodParser::new(msg.data);
    p.enter_struct()?;
    let first_id = p.get_int()? as u32;
    let n_types = p.get_int()?;
    if n_types < 0 || n_types as usize > MAX_UPDATE_TYPES {
        return Err(ProtocolError::InvalidPayload(format!(
            "unreasonable type count {n_types}"
        )));
    }
    if first_id as usize > MAX_UPDATE_TYPES {
        return Err(ProtocolError::InvalidPayload(format!(
            "unreasonable first slot {first_id}"
        )));
    }
    let mut names = Vec::new();
    for _ in 0..n_types {
        names.push(p.get_string()?);
    }
    p.leave()?;
    map.apply_update(first_id, &names);
    Ok(())
}

/// Marshals `UpdateTypes` with an arbitrary window of names.
pub fn core_marshal_update_types(
    b: &mut PodBuilder<'_>,
    first_id: u32,
    names: &[&str],
) -> Result<(), ProtocolError> {
    b.open_struct()?;
    b.write_int(first_id as i32)?;
    b.write_int(names.len() as i32)?;
    for name in names {
        b.write_string(name)?;
    }
    b.close()?;
    Ok(())
}

/// Announces our whole type table, first slot zero. Sent once before the
/// first event so the peer can translate everything that follows.
pub fn announce_type_table(b: &mut PodBuilder<'_>) -> Result<(), ProtocolError> {
    let names: Vec<&str> = TYPE_MAP.iter().map(|r| r.name).collect();
    core_marshal_update_types(b, 0, &names)
}

/// Marshals a core `Error` event: `(target_id, seq, errno, text)`.
pub fn core_marshal_error(
    b: &mut PodBuilder<'_>,
    target_id: u32,
    seq: u32,
    errno: ErrorId,
    text: &str,
) -> Result<(), ProtocolError> {
    b.open_struct()?;
    b.write_int(target_id as i32)?;
    b.write_int(seq as i32)?;
    b.write_int(errno as u32 as i32)?;
    b.write_string(text)?;
    b.close()?;
    Ok(())
}

/// Demarshals a core `Error` event.
pub fn core_demarshal_error<'a>(
    msg: &Message<'a>,
) -> Result<(u32, u32, ErrorId, &'a str), ProtocolError> {
    let mut p = PodParser::new(msg.data);
    p.enter_struct()?;
    let target_id = p.get_int()? as u32;
    let seq = p.get_int()? as u32;
    let raw = p.get_int()? as u32;
    let errno = ErrorId::from_wire(raw)
        .ok_or_else(|| ProtocolError::InvalidPayload(format!("unknown error id {raw}")))?;
    let text = p.get_string()?;
    p.leave()?;
    Ok((target_id, seq, errno, text))
}

/// Таблица методов ядра v0; прочие опкоды ядра разбирает хозяин цикла
/// событий, здесь только то, что нужно слою совместимости.
pub static CORE_V0_DEMARSHAL: &[DemarshalEntry] = &[DemarshalEntry {
    opcode: v0_core_method::UPDATE_TYPES,
    func: core_demarshal_update_types,
    flags: 0,
}];

/// Маршал-таблица интерфейса ядра для соединений v0.
pub fn core_v0_marshal() -> InterfaceMarshal {
    InterfaceMarshal {
        interface_type: ids::INTERFACE_CORE,
        version: 0,
        n_methods: v0_core_method::NUM,
        n_events: v0_core_event::NUM,
        demarshal: CORE_V0_DEMARSHAL,
    }
}
