//! Перезапись POD-деревьев между словарями v0 и v2.
//!
//! Обход рекурсивный: парсер ведёт одну сторону, билдер — другую.
//! Идентификаторы переводятся через карту клиента, объекты меняют
//! порядок полей `(type, id)`, легаси-свойства v0 превращаются в пары
//! Property/Choice и обратно. Обе функции возвращают свежий буфер и не
//! трогают вход; ошибка посреди обхода фатальна для всего дерева.

use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, error};

use crate::error::decode::PodDecodeError;
use crate::error::encode::PodEncodeError;
use crate::error::remap::RemapError;
use crate::pod::builder::PodBuilder;
use crate::pod::parser::{parse_in, Pod};
use crate::pod::types::{
    align8, ids, prop0_flags, ChoiceType, PodType, MAX_NESTING_DEPTH, POD_HEADER_SIZE,
};

use super::type_map::CompatTypeMap;

/// Переписывает дерево из словаря v0 в текущий (v2).
///
/// Результат — свежевыделенный буфер с одним POD. До объявления таблицы
/// типов пира любая перезапись завершается `Uninitialised`.
pub fn remap_from_v0(map: &CompatTypeMap, pod: &Pod<'_>) -> Result<Vec<u8>, RemapError> {
    if !map.is_initialised() {
        return Err(RemapError::Uninitialised);
    }
    debug!("remap {} pod of {} bytes from v0", pod.type_(), pod.size());
    build_with_retry(pod.footprint().max(256), |b| walk_from_v0(map, pod, b, 0))
}

/// Переписывает дерево из текущего словаря (v2) в v0.
pub fn remap_to_v0(map: &CompatTypeMap, pod: &Pod<'_>) -> Result<Vec<u8>, RemapError> {
    if !map.is_initialised() {
        return Err(RemapError::Uninitialised);
    }
    debug!("remap {} pod of {} bytes to v0", pod.type_(), pod.size());
    build_with_retry(pod.footprint().max(256), |b| walk_to_v0(map, pod, b, 0))
}

/// Сборка в свежий буфер с повтором по переполнению: билдер сообщает
/// требуемую ёмкость, второй проход всегда помещается.
fn build_with_retry(
    initial: usize,
    mut build: impl FnMut(&mut PodBuilder<'_>) -> Result<(), RemapError>,
) -> Result<Vec<u8>, RemapError> {
    let mut cap = align8(initial);
    loop {
        let mut buf = vec![0u8; cap];
        let mut b = PodBuilder::new(&mut buf);
        build(&mut b)?;
        match b.finish() {
            Ok(n) => {
                buf.truncate(n);
                return Ok(buf);
            }
            Err(PodEncodeError::Overflow { required }) => cap = required,
            Err(e) => return Err(e.into()),
        }
    }
}

fn translate_v0(
    map: &CompatTypeMap,
    slot: u32,
    tag: PodType,
    offset: usize,
) -> Result<u32, RemapError> {
    let id = map.from_v0(slot)?;
    if id == ids::INVALID {
        error!("unknown v0 slot {slot} in {tag} pod at byte {offset}");
        return Err(RemapError::RemapFailed { tag, offset });
    }
    Ok(id)
}

fn translate_v2(
    map: &CompatTypeMap,
    id: u32,
    tag: PodType,
    offset: usize,
) -> Result<u32, RemapError> {
    let slot = map.from_v2(id)?;
    if slot == ids::INVALID {
        error!("identifier {id:#x} has no v0 slot, in {tag} pod at byte {offset}");
        return Err(RemapError::RemapFailed { tag, offset });
    }
    Ok(slot)
}

fn check_depth(depth: usize) -> Result<(), RemapError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(RemapError::Decode(PodDecodeError::DepthLimit {
            current: depth,
            max: MAX_NESTING_DEPTH,
        }));
    }
    Ok(())
}

// --- v0 -> v2 ---

fn walk_from_v0(
    map: &CompatTypeMap,
    pod: &Pod<'_>,
    b: &mut PodBuilder<'_>,
    depth: usize,
) -> Result<(), RemapError> {
    check_depth(depth)?;
    match pod.type_() {
        PodType::Id => {
            let slot = pod.as_id()?;
            b.write_id(translate_v0(map, slot, PodType::Id, pod.offset())?)?;
        }
        // Тег Choice в v0 занимало легаси-свойство Prop.
        PodType::Choice => legacy_prop_from_v0(map, pod, b)?,
        PodType::Object => object_from_v0(map, pod, b, depth)?,
        PodType::Struct => {
            b.open_struct()?;
            for child in pod.as_struct()? {
                walk_from_v0(map, &child?, b, depth + 1)?;
            }
            b.close()?;
        }
        _ => b.write_pod(pod)?,
    }
    Ok(())
}

/// Легаси-свойство v0: `(key, flags, value, alternatives...)`, вид
/// диапазона закодирован в младших битах `flags`.
struct LegacyProp<'a> {
    key: u32,
    flags: u32,
    value: Pod<'a>,
    alts: &'a [u8],
}

fn parse_legacy_prop<'a>(pod: &Pod<'a>) -> Result<LegacyProp<'a>, PodDecodeError> {
    let body = pod.body();
    if body.len() < 16 {
        return Err(PodDecodeError::Malformed {
            offset: pod.offset(),
            reason: "legacy prop body too short".into(),
        });
    }
    let value = parse_in(body, 8, pod.offset() + POD_HEADER_SIZE)?;
    // Альтернативы идут сразу за значением, без выравнивания.
    let alts = &body[16 + value.size()..];
    if value.size() == 0 {
        if !alts.is_empty() {
            return Err(PodDecodeError::Malformed {
                offset: pod.offset(),
                reason: "zero-size alternatives in a non-empty stream".into(),
            });
        }
    } else if alts.len() % value.size() != 0 {
        return Err(PodDecodeError::Malformed {
            offset: pod.offset(),
            reason: format!(
                "alternative stream of {} bytes is not a multiple of {}",
                alts.len(),
                value.size()
            ),
        });
    }
    Ok(LegacyProp {
        key: LittleEndian::read_u32(&body[..4]),
        flags: LittleEndian::read_u32(&body[4..8]),
        value,
        alts,
    })
}

fn legacy_prop_from_v0(
    map: &CompatTypeMap,
    pod: &Pod<'_>,
    b: &mut PodBuilder<'_>,
) -> Result<(), RemapError> {
    let prop = parse_legacy_prop(pod)?;
    let key = translate_v0(map, prop.key, PodType::Choice, pod.offset())?;

    let mut choice_type = match prop.flags & prop0_flags::RANGE_MASK {
        prop0_flags::RANGE_MIN_MAX => ChoiceType::Range,
        prop0_flags::RANGE_STEP => ChoiceType::Step,
        prop0_flags::RANGE_ENUM => ChoiceType::Enum,
        prop0_flags::RANGE_FLAGS => ChoiceType::Flags,
        _ => ChoiceType::None,
    };
    // Без UNSET значение зафиксировано: какое бы ограничение ни было
    // объявлено, остаётся одно значение по умолчанию.
    if prop.flags & prop0_flags::UNSET == 0 {
        choice_type = ChoiceType::None;
    }

    // Элементы Choice обязаны иметь фиксированный размер; легаси-свойство
    // с другим значением не переводится.
    if choice_type != ChoiceType::None
        && prop.value.type_().fixed_body_size() != Some(prop.value.size() as u32)
    {
        error!(
            "legacy prop value {}/{} cannot form choice elements, at byte {}",
            prop.value.type_(),
            prop.value.size(),
            pod.offset()
        );
        return Err(RemapError::RemapFailed {
            tag: PodType::Choice,
            offset: pod.offset(),
        });
    }

    b.open_property(key, 0)?;
    if choice_type == ChoiceType::None {
        write_translated_value(map, &prop.value, b)?;
    } else {
        b.open_choice(choice_type, 0)?;
        if prop.value.type_() == PodType::Id {
            let id = prop.value.as_id()?;
            b.write_id(translate_v0(map, id, PodType::Id, prop.value.offset())?)?;
            for alt in prop.alts.chunks_exact(prop.value.size().max(1)) {
                let slot = LittleEndian::read_u32(alt);
                b.write_id(translate_v0(map, slot, PodType::Id, pod.offset())?)?;
            }
        } else {
            b.write_value(prop.value.type_(), prop.value.body())?;
            b.raw(prop.alts);
        }
        b.close()?;
    }
    b.close()?;
    Ok(())
}

fn write_translated_value(
    map: &CompatTypeMap,
    value: &Pod<'_>,
    b: &mut PodBuilder<'_>,
) -> Result<(), RemapError> {
    if value.type_() == PodType::Id {
        let slot = value.as_id()?;
        b.write_id(translate_v0(map, slot, PodType::Id, value.offset())?)?;
    } else {
        b.write_pod(value)?;
    }
    Ok(())
}

fn object_from_v0(
    map: &CompatTypeMap,
    pod: &Pod<'_>,
    b: &mut PodBuilder<'_>,
    depth: usize,
) -> Result<(), RemapError> {
    let obj = pod.as_object()?;
    // В v0 поля лежали в обратном порядке.
    let new_type = translate_v0(map, obj.object_id, PodType::Object, pod.offset())?;
    let new_id = translate_v0(map, obj.object_type, PodType::Object, pod.offset())?;
    b.open_object(new_type, new_id)?;

    let mut media_ids = 0u32;
    for child in obj.children() {
        let child = child?;
        // Первые два Id-ребёнка формата становятся свойствами
        // mediaType / mediaSubtype.
        if new_type == ids::OBJECT_FORMAT && media_ids < 2 && child.type_() == PodType::Id {
            let id = translate_v0(map, child.as_id()?, PodType::Id, child.offset())?;
            let key = if media_ids == 0 {
                ids::FORMAT_MEDIA_TYPE
            } else {
                ids::FORMAT_MEDIA_SUBTYPE
            };
            b.open_property(key, 0)?;
            b.write_id(id)?;
            b.close()?;
            media_ids += 1;
            continue;
        }
        match child.type_() {
            PodType::Choice => legacy_prop_from_v0(map, &child, b)?,
            _ => {
                // Объекты v0 держат голые поды; обёртка без ключа
                // сохраняет форму объекта v2.
                b.open_property(0, 0)?;
                walk_from_v0(map, &child, b, depth + 1)?;
                b.close()?;
            }
        }
    }
    b.close()?;
    Ok(())
}

// --- v2 -> v0 ---

fn walk_to_v0(
    map: &CompatTypeMap,
    pod: &Pod<'_>,
    b: &mut PodBuilder<'_>,
    depth: usize,
) -> Result<(), RemapError> {
    check_depth(depth)?;
    match pod.type_() {
        PodType::Id => {
            let id = pod.as_id()?;
            b.write_id(translate_v2(map, id, PodType::Id, pod.offset())?)?;
        }
        PodType::Object => object_to_v0(map, pod, b)?,
        PodType::Struct => {
            b.open_struct()?;
            for child in pod.as_struct()? {
                walk_to_v0(map, &child?, b, depth + 1)?;
            }
            b.close()?;
        }
        _ => b.write_pod(pod)?,
    }
    Ok(())
}

fn object_to_v0(
    map: &CompatTypeMap,
    pod: &Pod<'_>,
    b: &mut PodBuilder<'_>,
) -> Result<(), RemapError> {
    let obj = pod.as_object()?;

    if obj.object_type == ids::COMMAND_NODE {
        // В v0 тип команды лежит в object_id, отдельного типа нет.
        let row = translate_v2(map, obj.object_id, PodType::Object, pod.offset())?;
        b.open_object(0, row)?;
    } else {
        // Обратная перестановка полей.
        let type_field = translate_v2(map, obj.object_id, PodType::Object, pod.offset())?;
        let id_field = translate_v2(map, obj.object_type, PodType::Object, pod.offset())?;
        b.open_object(type_field, id_field)?;
    }

    for prop in obj.properties() {
        let prop = prop?;
        let values = prop.value.values()?;

        // mediaType / mediaSubtype уходят обратно голыми Id-детьми.
        if obj.object_type == ids::OBJECT_FORMAT
            && (prop.key == ids::FORMAT_MEDIA_TYPE || prop.key == ids::FORMAT_MEDIA_SUBTYPE)
        {
            let id = values.id_at(0)?;
            b.write_id(translate_v2(map, id, PodType::Id, prop.value.offset())?)?;
            continue;
        }

        if values.choice_type == ChoiceType::None {
            // Choice без ограничения сворачивается в голое значение.
            write_collapsed_value(map, &values, prop.value.offset(), b)?;
            continue;
        }

        let key0 = translate_v2(map, prop.key, PodType::Property, prop.offset())?;
        let flags0 = prop0_flags::UNSET
            | match values.choice_type {
                ChoiceType::Range => prop0_flags::RANGE_MIN_MAX,
                ChoiceType::Step => prop0_flags::RANGE_STEP,
                ChoiceType::Enum => prop0_flags::RANGE_ENUM,
                ChoiceType::Flags => prop0_flags::RANGE_FLAGS,
                ChoiceType::None => prop0_flags::RANGE_NONE,
            };

        // Тело легаси-свойства известно целиком заранее, собираем его и
        // пишем одним значением с тегом Choice.
        let mut body =
            Vec::with_capacity(16 + values.len() * values.child_size as usize);
        let mut word = [0u8; 4];
        for v in [key0, flags0, values.child_size, values.child_type as u32] {
            LittleEndian::write_u32(&mut word, v);
            body.extend_from_slice(&word);
        }
        if values.child_type == PodType::Id {
            for i in 0..values.len() {
                let id = values.id_at(i)?;
                LittleEndian::write_u32(
                    &mut word,
                    translate_v2(map, id, PodType::Id, prop.value.offset())?,
                );
                body.extend_from_slice(&word);
            }
        } else {
            for e in values.elements() {
                body.extend_from_slice(e);
            }
        }
        b.write_value(PodType::Choice, &body)?;
    }
    b.close()?;
    Ok(())
}

fn write_collapsed_value(
    map: &CompatTypeMap,
    values: &crate::pod::parser::Values<'_>,
    offset: usize,
    b: &mut PodBuilder<'_>,
) -> Result<(), RemapError> {
    let body = values.element(0).ok_or(PodDecodeError::Malformed {
        offset,
        reason: "choice holds no value".into(),
    })?;
    if values.child_type == PodType::Id {
        let id = values.id_at(0)?;
        b.write_id(translate_v2(map, id, PodType::Id, offset)?)?;
    } else {
        b.write_value(values.child_type, body)?;
    }
    Ok(())
}
