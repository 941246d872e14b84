//! Wavum — ядро сериализации мультимедийного графового демона.
//!
//! Здесь живут две тесно связанные вещи:
//! - `pod` — самоописывающийся бинарный кодек тегированных значений
//!   (скаляры, строки, массивы, структуры, объекты со свойствами,
//!   Choice-ограничения) поверх буферов вызывающей стороны;
//! - `protocol` — слой совместимости, переводящий POD-деревья и
//!   идентификаторы между легаси-словарём v0 (таблица типов
//!   согласуется на соединение) и текущим словарём v2 (идентификаторы
//!   фиксированы глобально).
//!
//! Транспорт, цикл событий и планирование графа — внешние участники:
//! кодек не блокируется, ничего не ждёт и не владеет вводом-выводом.

/// Типы ошибок: разбор, кодирование, фильтрация, перезапись, протокол.
pub mod error;
/// Бинарный кодек POD: раскладка, билдер, парсер, фильтр свойств.
pub mod pod;
/// Совместимость v0/v2: таблицы типов, перезапись деревьев, демаршалеры.
pub mod protocol;

/// Реэкспорт типов кодека.
pub use pod::{
    align8, filter_object, filter_values, ArrayPod, ChoicePod, ChoiceType, Fraction, ObjectPod,
    Pod, PodBuilder, PodParser, PodType, PropertyPod, Rectangle, SequencePod, Values,
};

/// Реэкспорт ошибок.
pub use error::{
    FilterError, PodDecodeError, PodEncodeError, ProtocolError, RemapError,
};

/// Реэкспорт слоя совместимости.
pub use protocol::{
    announce_type_table, remap_from_v0, remap_to_v0, CompatTypeMap, ErrorId, InterfaceMarshal,
    MarshalRegistry, Message, TYPE_MAP,
};
