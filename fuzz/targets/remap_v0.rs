#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use wavum::{remap_from_v0, remap_to_v0, CompatTypeMap, Pod, TYPE_MAP};

#[derive(Debug, Arbitrary)]
struct RemapFuzzInput {
    /// Произвольные байты, среди которых попадаются валидные деревья.
    data: Vec<u8>,
    /// Сдвиг нумерации таблицы пира.
    first_id: u8,
    to_v0: bool,
}

fuzz_target!(|input: RemapFuzzInput| {
    let mut map = CompatTypeMap::new();
    let names: Vec<&str> = TYPE_MAP.iter().map(|r| r.name).collect();
    map.apply_update(input.first_id as u32, &names);

    // Перезапись не должна паниковать и не должна трогать вход.
    if let Ok(pod) = Pod::from_bytes(&input.data) {
        let snapshot = input.data.clone();
        if input.to_v0 {
            let _ = remap_to_v0(&map, &pod);
        } else {
            let _ = remap_from_v0(&map, &pod);
        }
        assert_eq!(input.data, snapshot);
    }
});
