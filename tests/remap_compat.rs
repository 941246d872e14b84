//! Интеграционные сценарии слоя совместимости v0/v2.

use byteorder::{ByteOrder, LittleEndian};

use wavum::pod::types::{ids, prop0_flags};
use wavum::protocol::v2_to_row;
use wavum::{
    filter_values, remap_from_v0, remap_to_v0, ChoiceType, CompatTypeMap, FilterError, Pod,
    PodBuilder, PodType, RemapError, TYPE_MAP,
};

fn identity_map() -> CompatTypeMap {
    let mut map = CompatTypeMap::new();
    let names: Vec<_> = TYPE_MAP.iter().map(|r| r.name).collect();
    map.apply_update(0, &names);
    map
}

/// Пир нумерует свою таблицу со сдвигом: слоты пира != наши слоты.
fn shifted_map(shift: u32) -> CompatTypeMap {
    let mut map = CompatTypeMap::new();
    let names: Vec<_> = TYPE_MAP.iter().map(|r| r.name).collect();
    map.apply_update(shift, &names);
    map
}

fn build(f: impl FnOnce(&mut PodBuilder<'_>)) -> Vec<u8> {
    let mut buf = vec![0u8; 8192];
    let mut b = PodBuilder::new(&mut buf);
    f(&mut b);
    let n = b.finish().unwrap();
    buf.truncate(n);
    buf
}

fn our_slot(id: u32) -> u32 {
    v2_to_row(id).unwrap()
}

/// Легаси-свойство v0 одним куском: (key, flags, value, alternatives).
fn legacy_prop(b: &mut PodBuilder<'_>, key: u32, flags: u32, child: PodType, vals: &[u32]) {
    let mut body = Vec::new();
    let mut w = [0u8; 4];
    for v in [key, flags, 4, child as u32] {
        LittleEndian::write_u32(&mut w, v);
        body.extend_from_slice(&w);
    }
    for v in vals {
        LittleEndian::write_u32(&mut w, *v);
        body.extend_from_slice(&w);
    }
    b.write_value(PodType::Choice, &body).unwrap();
}

#[test]
fn test_format_remap_from_v0_with_shifted_peer_table() {
    let map = shifted_map(10);
    let peer = |id: u32| our_slot(id) + 10;

    // Формат v0: (type, id) переставлены, первые два ребёнка — голые Id.
    let v0 = build(|b| {
        b.open_object(peer(ids::OBJECT_FORMAT), peer(ids::OBJECT_FORMAT))
            .unwrap();
        b.write_id(peer(ids::MEDIA_TYPE_AUDIO)).unwrap();
        b.write_id(peer(ids::MEDIA_SUBTYPE_RAW)).unwrap();
        legacy_prop(
            b,
            peer(ids::FORMAT_AUDIO_RATE),
            prop0_flags::RANGE_ENUM | prop0_flags::UNSET,
            PodType::Int,
            &[48000, 44100],
        );
        b.close().unwrap();
    });

    let out = remap_from_v0(&map, &Pod::from_bytes(&v0).unwrap()).unwrap();
    let obj = Pod::from_bytes(&out).unwrap().as_object().unwrap();
    assert_eq!(obj.object_type, ids::OBJECT_FORMAT);
    assert_eq!(obj.object_id, ids::OBJECT_FORMAT);

    let media = obj.find_prop(ids::FORMAT_MEDIA_TYPE).unwrap().unwrap();
    assert_eq!(media.value.as_id().unwrap(), ids::MEDIA_TYPE_AUDIO);
    let sub = obj.find_prop(ids::FORMAT_MEDIA_SUBTYPE).unwrap().unwrap();
    assert_eq!(sub.value.as_id().unwrap(), ids::MEDIA_SUBTYPE_RAW);

    let rate = obj.find_prop(ids::FORMAT_AUDIO_RATE).unwrap().unwrap();
    let v = rate.value.values().unwrap();
    assert_eq!(v.choice_type, ChoiceType::Enum);
    assert_eq!(v.n_values, 2);
    assert_eq!(LittleEndian::read_i32(v.element(0).unwrap()), 48000);
}

#[test]
fn test_roundtrip_identity_on_translatable_tree() {
    let map = identity_map();

    let v0 = build(|b| {
        b.open_object(our_slot(ids::OBJECT_FORMAT), our_slot(ids::OBJECT_FORMAT))
            .unwrap();
        b.write_id(our_slot(ids::MEDIA_TYPE_AUDIO)).unwrap();
        b.write_id(our_slot(ids::MEDIA_SUBTYPE_RAW)).unwrap();
        legacy_prop(
            b,
            our_slot(ids::FORMAT_AUDIO_RATE),
            prop0_flags::RANGE_ENUM | prop0_flags::UNSET,
            PodType::Int,
            &[48000, 44100, 96000],
        );
        b.close().unwrap();
    });

    let v2 = remap_from_v0(&map, &Pod::from_bytes(&v0).unwrap()).unwrap();
    let back = remap_to_v0(&map, &Pod::from_bytes(&v2).unwrap()).unwrap();
    // Идентичность с точностью до байта на переводимом дереве.
    assert_eq!(back, v0);
}

#[test]
fn test_roundtrip_collapses_fixed_prop() {
    let map = identity_map();

    // Свойство без UNSET: ограничение вырождается, альтернативы
    // теряются — это ожидаемая потеря при свёртке Choice-None.
    let v0 = build(|b| {
        b.open_object(our_slot(ids::OBJECT_PROPS), our_slot(ids::OBJECT_PROPS))
            .unwrap();
        legacy_prop(
            b,
            our_slot(ids::FORMAT_AUDIO_CHANNELS),
            prop0_flags::RANGE_ENUM,
            PodType::Int,
            &[2, 1, 6],
        );
        b.close().unwrap();
    });

    let v2 = remap_from_v0(&map, &Pod::from_bytes(&v0).unwrap()).unwrap();
    let obj = Pod::from_bytes(&v2).unwrap().as_object().unwrap();
    let prop = obj.find_prop(ids::FORMAT_AUDIO_CHANNELS).unwrap().unwrap();
    assert_eq!(prop.value.as_int().unwrap(), 2);

    let back = remap_to_v0(&map, &Pod::from_bytes(&v2).unwrap()).unwrap();
    let obj0 = Pod::from_bytes(&back).unwrap().as_object().unwrap();
    let kids: Vec<_> = obj0.children().collect::<Result<_, _>>().unwrap();
    assert_eq!(kids.len(), 1);
    assert_eq!(kids[0].as_int().unwrap(), 2);
}

#[test]
fn test_remap_requires_initialised_table() {
    let map = CompatTypeMap::new();
    let v0 = build(|b| b.write_id(3).unwrap());
    assert_eq!(
        remap_from_v0(&map, &Pod::from_bytes(&v0).unwrap()).unwrap_err(),
        RemapError::Uninitialised
    );
}

#[test]
fn test_remap_unknown_slot_is_fatal() {
    let map = identity_map();
    let bad_slot = TYPE_MAP.len() as u32 + 7;
    let v0 = build(|b| {
        b.open_struct().unwrap();
        b.write_id(bad_slot).unwrap();
        b.close().unwrap();
    });
    let err = remap_from_v0(&map, &Pod::from_bytes(&v0).unwrap()).unwrap_err();
    assert!(matches!(
        err,
        RemapError::RemapFailed {
            tag: PodType::Id,
            ..
        }
    ));
}

#[test]
fn test_choice_filter_empty_intersection() {
    // Частоты перечисления лежат ниже минимума диапазона.
    let enum_rates = build(|b| {
        b.open_choice(ChoiceType::Enum, 0).unwrap();
        b.write_int(48000).unwrap();
        b.write_int(44100).unwrap();
        b.close().unwrap();
    });
    let range = build(|b| {
        b.open_choice(ChoiceType::Range, 0).unwrap();
        b.write_int(96000).unwrap();
        b.write_int(88200).unwrap();
        b.write_int(192000).unwrap();
        b.close().unwrap();
    });

    let a = Pod::from_bytes(&enum_rates).unwrap();
    let r = Pod::from_bytes(&range).unwrap();
    let mut buf = vec![0u8; 1024];
    let mut out = PodBuilder::new(&mut buf);
    assert_eq!(
        filter_values(&a, &r, &mut out).unwrap_err(),
        FilterError::NoIntersection
    );
}
