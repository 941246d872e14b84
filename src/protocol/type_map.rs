//! Таблицы типов для совместимости с протоколом v0.
//!
//! В v0 числовые идентификаторы не были фиксированы: при установке
//! соединения каждая сторона объявляла свою таблицу строковых имён, и
//! идентификатором служил индекс в ней. Глобальная таблица ниже хранит
//! соответствие «легаси-имя → текущий (v2) идентификатор»; индекс строки
//! и есть слот v0 нашей стороны. Карта клиента сопоставляет слоты,
//! которые использует пир, строкам этой таблицы.

use tracing::{debug, warn};

use crate::error::remap::RemapError;
use crate::pod::types::ids;

/// Строка глобальной таблицы: легаси-имя и текущий идентификатор.
#[derive(Debug, Clone, Copy)]
pub struct TypeRow {
    pub name: &'static str,
    pub id: u32,
}

const fn row(name: &'static str, id: u32) -> TypeRow {
    TypeRow { name, id }
}

/// Глобальная таблица типов. Порядок строк — это слоты v0, которые наша
/// сторона объявляет пиру; менять его нельзя.
pub static TYPE_MAP: &[TypeRow] = &[
    row("Wavum:Interface:Core", ids::INTERFACE_CORE),
    row("Wavum:Interface:Registry", ids::INTERFACE_REGISTRY),
    row("Wavum:Interface:Node", ids::INTERFACE_NODE),
    row("Wavum:Interface:Port", ids::INTERFACE_PORT),
    row("Wavum:Interface:Client", ids::INTERFACE_CLIENT),
    row("Wavum:Interface:Link", ids::INTERFACE_LINK),
    row("Wavum:Interface:Factory", ids::INTERFACE_FACTORY),
    row("Wavum:Interface:Module", ids::INTERFACE_MODULE),
    row("Wavum:Object:Props", ids::OBJECT_PROPS),
    row("Wavum:Object:Format", ids::OBJECT_FORMAT),
    row("Wavum:Object:PropInfo", ids::OBJECT_PROP_INFO),
    row("Wavum:Object:Format:mediaType", ids::FORMAT_MEDIA_TYPE),
    row("Wavum:Object:Format:mediaSubtype", ids::FORMAT_MEDIA_SUBTYPE),
    row("Wavum:Object:Format:Audio:format", ids::FORMAT_AUDIO_FORMAT),
    row("Wavum:Object:Format:Audio:rate", ids::FORMAT_AUDIO_RATE),
    row("Wavum:Object:Format:Audio:channels", ids::FORMAT_AUDIO_CHANNELS),
    row("Wavum:Enum:MediaType:audio", ids::MEDIA_TYPE_AUDIO),
    row("Wavum:Enum:MediaType:video", ids::MEDIA_TYPE_VIDEO),
    row("Wavum:Enum:MediaType:midi", ids::MEDIA_TYPE_MIDI),
    row("Wavum:Enum:MediaSubtype:raw", ids::MEDIA_SUBTYPE_RAW),
    row("Wavum:Enum:MediaSubtype:dsp", ids::MEDIA_SUBTYPE_DSP),
    row("Wavum:Enum:MediaSubtype:mp3", ids::MEDIA_SUBTYPE_MP3),
    row("Wavum:Enum:MediaSubtype:aac", ids::MEDIA_SUBTYPE_AAC),
    row("Wavum:Enum:AudioFormat:S16", ids::AUDIO_FORMAT_S16),
    row("Wavum:Enum:AudioFormat:S32", ids::AUDIO_FORMAT_S32),
    row("Wavum:Enum:AudioFormat:F32", ids::AUDIO_FORMAT_F32),
    row("Wavum:Enum:AudioFormat:F64", ids::AUDIO_FORMAT_F64),
    row("Wavum:Command:Node", ids::COMMAND_NODE),
    row("Wavum:Command:Node:Suspend", ids::COMMAND_NODE_SUSPEND),
    row("Wavum:Command:Node:Pause", ids::COMMAND_NODE_PAUSE),
    row("Wavum:Command:Node:Start", ids::COMMAND_NODE_START),
];

/// Ищет строку таблицы по легаси-имени.
pub fn find_row_by_name(name: &str) -> Option<u32> {
    TYPE_MAP
        .iter()
        .position(|r| r.name == name)
        .map(|i| i as u32)
}

/// Текущий идентификатор по номеру строки.
pub fn row_to_v2(row: u32) -> Option<u32> {
    TYPE_MAP.get(row as usize).map(|r| r.id)
}

/// Номер строки по текущему идентификатору (он же слот v0 нашей стороны).
pub fn v2_to_row(id: u32) -> Option<u32> {
    TYPE_MAP
        .iter()
        .position(|r| r.id == id)
        .map(|i| i as u32)
}

/// Легаси-имя строки, для диагностики.
pub fn row_name(row: u32) -> Option<&'static str> {
    TYPE_MAP.get(row as usize).map(|r| r.name)
}

/// Карта типов одного клиента: слот пира → строка глобальной таблицы.
///
/// Заполняется демаршалером `UpdateTypes` в начале сессии и после этого
/// только читается; арена на индексах вместо ссылок.
#[derive(Debug, Default)]
pub struct CompatTypeMap {
    slots: Vec<u32>,
    initialised: bool,
}

impl CompatTypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Таблица пира уже объявлена?
    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// Привязывает слот пира к строке глобальной таблицы.
    pub fn install(&mut self, slot: u32, row: u32) {
        let slot = slot as usize;
        if self.slots.len() <= slot {
            self.slots.resize(slot + 1, ids::INVALID);
        }
        self.slots[slot] = row;
    }

    /// Строка глобальной таблицы для слота пира.
    pub fn lookup(&self, slot: u32) -> Option<u32> {
        match self.slots.get(slot as usize) {
            Some(&row) if row != ids::INVALID => Some(row),
            _ => None,
        }
    }

    /// Вносит пакет имён из сообщения `UpdateTypes` пира.
    ///
    /// Имя, не известное нашей таблице, получает слот без привязки: его
    /// идентификаторы останутся непереводимыми, но нумерация остальных
    /// слотов не съедет.
    pub fn apply_update(&mut self, first_id: u32, names: &[&str]) {
        for (i, name) in names.iter().enumerate() {
            let slot = first_id + i as u32;
            match find_row_by_name(name) {
                Some(table_row) => self.install(slot, table_row),
                None => {
                    warn!("can't match peer type {name:?} for slot {slot}");
                    self.install(slot, ids::INVALID);
                }
            }
        }
        debug!("installed {} peer type(s) from {first_id}", names.len());
        self.initialised = true;
    }

    /// Переводит слот пира (v0) в текущий идентификатор.
    ///
    /// Неизвестный слот — это `INVALID`, решение о фатальности принимает
    /// обходчик дерева.
    pub fn from_v0(&self, slot: u32) -> Result<u32, RemapError> {
        if !self.initialised {
            return Err(RemapError::Uninitialised);
        }
        Ok(self
            .lookup(slot)
            .and_then(row_to_v2)
            .unwrap_or(ids::INVALID))
    }

    /// Переводит текущий идентификатор в слот v0 нашей стороны.
    ///
    /// Наша сторона объявляет пиру всю таблицу с нулевого слота, поэтому
    /// слотом служит номер строки.
    pub fn from_v2(&self, id: u32) -> Result<u32, RemapError> {
        if !self.initialised {
            return Err(RemapError::Uninitialised);
        }
        Ok(v2_to_row(id).unwrap_or(ids::INVALID))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_names() -> Vec<&'static str> {
        TYPE_MAP.iter().map(|r| r.name).collect()
    }

    #[test]
    fn test_table_ids_unique() {
        for (i, a) in TYPE_MAP.iter().enumerate() {
            for b in &TYPE_MAP[i + 1..] {
                assert_ne!(a.id, b.id, "duplicate id for {} and {}", a.name, b.name);
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn test_identity_mapping_after_full_update() {
        let mut map = CompatTypeMap::new();
        map.apply_update(0, &all_names());
        for (slot, row) in TYPE_MAP.iter().enumerate() {
            assert_eq!(map.from_v0(slot as u32).unwrap(), row.id);
            assert_eq!(map.from_v2(row.id).unwrap(), slot as u32);
        }
    }

    #[test]
    fn test_uninitialised_map_refuses_translation() {
        let map = CompatTypeMap::new();
        assert_eq!(map.from_v0(0), Err(RemapError::Uninitialised));
        assert_eq!(
            map.from_v2(crate::pod::types::ids::OBJECT_FORMAT),
            Err(RemapError::Uninitialised)
        );
    }

    #[test]
    fn test_shifted_first_id() {
        let mut map = CompatTypeMap::new();
        // Пир нумерует свою таблицу с 100.
        map.apply_update(100, &["Wavum:Object:Format", "Wavum:Enum:MediaType:audio"]);
        assert_eq!(
            map.from_v0(100).unwrap(),
            crate::pod::types::ids::OBJECT_FORMAT
        );
        assert_eq!(
            map.from_v0(101).unwrap(),
            crate::pod::types::ids::MEDIA_TYPE_AUDIO
        );
        // Слоты вне пакета не привязаны.
        assert_eq!(map.from_v0(0).unwrap(), crate::pod::types::ids::INVALID);
    }

    #[test]
    fn test_unknown_peer_name_keeps_numbering() {
        let mut map = CompatTypeMap::new();
        map.apply_update(
            0,
            &[
                "Wavum:Interface:Core",
                "Ancient:Type:Gone",
                "Wavum:Interface:Node",
            ],
        );
        assert_eq!(
            map.from_v0(0).unwrap(),
            crate::pod::types::ids::INTERFACE_CORE
        );
        assert_eq!(map.from_v0(1).unwrap(), crate::pod::types::ids::INVALID);
        assert_eq!(
            map.from_v0(2).unwrap(),
            crate::pod::types::ids::INTERFACE_NODE
        );
    }
}
