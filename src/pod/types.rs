//! Раскладка POD-значений на проводе.
//!
//! Каждое значение предваряется 8-байтовым заголовком `(size, type)` в
//! little-endian, тело выравнивается до границы 8 байт нулевыми байтами.
//! Набор тегов закрыт: неизвестный тег — это ошибка разбора, а не
//! расширение формата.

use std::fmt;

/// Размер заголовка POD (size:u32 + type:u32).
pub const POD_HEADER_SIZE: usize = 8;

/// Максимальная вложенность контейнеров (32 уровня).
pub const MAX_NESTING_DEPTH: usize = 32;

/// Выравнивает длину до границы 8 байт.
#[inline]
pub const fn align8(n: usize) -> usize {
    (n + 7) & !7
}

/// Тег типа в заголовке POD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PodType {
    None = 1,
    Bool = 2,
    Id = 3,
    Int = 4,
    Long = 5,
    Float = 6,
    Double = 7,
    String = 8,
    Bytes = 9,
    Pointer = 10,
    Fd = 11,
    Rectangle = 12,
    Fraction = 13,
    Array = 14,
    Struct = 15,
    Object = 16,
    Property = 17,
    Choice = 18,
    Sequence = 19,
}

impl PodType {
    /// Читает тег с провода. Неизвестное значение — `None`.
    pub fn from_wire(raw: u32) -> Option<Self> {
        Some(match raw {
            1 => PodType::None,
            2 => PodType::Bool,
            3 => PodType::Id,
            4 => PodType::Int,
            5 => PodType::Long,
            6 => PodType::Float,
            7 => PodType::Double,
            8 => PodType::String,
            9 => PodType::Bytes,
            10 => PodType::Pointer,
            11 => PodType::Fd,
            12 => PodType::Rectangle,
            13 => PodType::Fraction,
            14 => PodType::Array,
            15 => PodType::Struct,
            16 => PodType::Object,
            17 => PodType::Property,
            18 => PodType::Choice,
            19 => PodType::Sequence,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            PodType::None => "None",
            PodType::Bool => "Bool",
            PodType::Id => "Id",
            PodType::Int => "Int",
            PodType::Long => "Long",
            PodType::Float => "Float",
            PodType::Double => "Double",
            PodType::String => "String",
            PodType::Bytes => "Bytes",
            PodType::Pointer => "Pointer",
            PodType::Fd => "Fd",
            PodType::Rectangle => "Rectangle",
            PodType::Fraction => "Fraction",
            PodType::Array => "Array",
            PodType::Struct => "Struct",
            PodType::Object => "Object",
            PodType::Property => "Property",
            PodType::Choice => "Choice",
            PodType::Sequence => "Sequence",
        }
    }

    /// Размер тела для типов фиксированного размера.
    ///
    /// Только такие типы допустимы как элементы Array и Choice.
    pub fn fixed_body_size(self) -> Option<u32> {
        match self {
            PodType::None => Some(0),
            PodType::Bool | PodType::Id | PodType::Int | PodType::Float => Some(4),
            PodType::Long
            | PodType::Double
            | PodType::Fd
            | PodType::Rectangle
            | PodType::Fraction => Some(8),
            PodType::Pointer => Some(16),
            _ => None,
        }
    }

    pub fn is_container(self) -> bool {
        matches!(
            self,
            PodType::Array
                | PodType::Struct
                | PodType::Object
                | PodType::Property
                | PodType::Choice
                | PodType::Sequence
        )
    }
}

impl fmt::Display for PodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Вид ограничения в Choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ChoiceType {
    /// Одно значение без ограничения.
    None = 0,
    /// `[default, min, max]`.
    Range = 1,
    /// `[default, min, max, step]`.
    Step = 2,
    /// `[default, alt...]`.
    Enum = 3,
    /// `[default, mask...]`.
    Flags = 4,
}

impl ChoiceType {
    pub fn from_wire(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => ChoiceType::None,
            1 => ChoiceType::Range,
            2 => ChoiceType::Step,
            3 => ChoiceType::Enum,
            4 => ChoiceType::Flags,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            ChoiceType::None => "None",
            ChoiceType::Range => "Range",
            ChoiceType::Step => "Step",
            ChoiceType::Enum => "Enum",
            ChoiceType::Flags => "Flags",
        }
    }

    /// Минимальное число элементов для корректного Choice этого вида.
    pub fn min_values(self) -> usize {
        match self {
            ChoiceType::None => 1,
            ChoiceType::Range => 3,
            ChoiceType::Step => 4,
            ChoiceType::Enum | ChoiceType::Flags => 1,
        }
    }
}

impl fmt::Display for ChoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Прямоугольник (ширина, высота).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rectangle {
    pub width: u32,
    pub height: u32,
}

impl Rectangle {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Рациональное число (числитель, знаменатель).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    pub num: u32,
    pub denom: u32,
}

impl Fraction {
    pub const fn new(num: u32, denom: u32) -> Self {
        Self { num, denom }
    }
}

/// Флаги свойства (v2).
pub mod prop_flags {
    pub const READ: u32 = 1 << 0;
    pub const WRITE: u32 = 1 << 1;
    /// Изменение значения требует повторной рассылки.
    pub const SERIAL: u32 = 1 << 2;
}

/// Флаги легаси-свойства (v0): вид диапазона в младших битах плюс
/// отдельные биты состояния.
pub mod prop0_flags {
    pub const RANGE_NONE: u32 = 0;
    pub const RANGE_MIN_MAX: u32 = 1;
    pub const RANGE_STEP: u32 = 2;
    pub const RANGE_ENUM: u32 = 3;
    pub const RANGE_FLAGS: u32 = 4;
    pub const RANGE_MASK: u32 = 0xf;

    pub const UNSET: u32 = 1 << 4;
    pub const OPTIONAL: u32 = 1 << 5;
    pub const READONLY: u32 = 1 << 6;
    pub const DEPRECATED: u32 = 1 << 7;
    pub const INFO: u32 = 1 << 8;
}

/// Глобальные (v2) идентификаторы домена.
///
/// Пространство разбито по базам, чтобы каждый идентификатор из таблицы
/// типов был уникален и обратный поиск был однозначным.
pub mod ids {
    pub const INVALID: u32 = u32::MAX;

    // Типы медиа (0x10000).
    pub const MEDIA_TYPE_AUDIO: u32 = 0x10001;
    pub const MEDIA_TYPE_VIDEO: u32 = 0x10002;
    pub const MEDIA_TYPE_MIDI: u32 = 0x10003;

    // Подтипы медиа (0x20000).
    pub const MEDIA_SUBTYPE_RAW: u32 = 0x20001;
    pub const MEDIA_SUBTYPE_DSP: u32 = 0x20002;
    pub const MEDIA_SUBTYPE_MP3: u32 = 0x20003;
    pub const MEDIA_SUBTYPE_AAC: u32 = 0x20004;

    // Форматы аудиосэмплов (0x30000).
    pub const AUDIO_FORMAT_S16: u32 = 0x30001;
    pub const AUDIO_FORMAT_S32: u32 = 0x30002;
    pub const AUDIO_FORMAT_F32: u32 = 0x30003;
    pub const AUDIO_FORMAT_F64: u32 = 0x30004;

    // Типы объектов (0x40000).
    pub const OBJECT_PROPS: u32 = 0x40001;
    pub const OBJECT_FORMAT: u32 = 0x40002;
    pub const OBJECT_PROP_INFO: u32 = 0x40003;

    // Команды (0x50000).
    pub const COMMAND_NODE: u32 = 0x50001;
    pub const COMMAND_NODE_SUSPEND: u32 = 0x50002;
    pub const COMMAND_NODE_PAUSE: u32 = 0x50003;
    pub const COMMAND_NODE_START: u32 = 0x50004;

    // Ключи свойств формата (0x60000).
    pub const FORMAT_MEDIA_TYPE: u32 = 0x60001;
    pub const FORMAT_MEDIA_SUBTYPE: u32 = 0x60002;
    pub const FORMAT_AUDIO_FORMAT: u32 = 0x60003;
    pub const FORMAT_AUDIO_RATE: u32 = 0x60004;
    pub const FORMAT_AUDIO_CHANNELS: u32 = 0x60005;

    // Интерфейсы (0x70000).
    pub const INTERFACE_CORE: u32 = 0x70001;
    pub const INTERFACE_REGISTRY: u32 = 0x70002;
    pub const INTERFACE_NODE: u32 = 0x70003;
    pub const INTERFACE_PORT: u32 = 0x70004;
    pub const INTERFACE_CLIENT: u32 = 0x70005;
    pub const INTERFACE_LINK: u32 = 0x70006;
    pub const INTERFACE_FACTORY: u32 = 0x70007;
    pub const INTERFACE_MODULE: u32 = 0x70008;
}
