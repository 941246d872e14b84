#![no_main]

use libfuzzer_sys::fuzz_target;

use wavum::{Pod, PodType};

/// Рекурсивный обход: парсер не должен паниковать ни на каких байтах.
fn walk(pod: &Pod<'_>, depth: usize) {
    if depth > 40 {
        return;
    }
    match pod.type_() {
        PodType::Bool => {
            let _ = pod.as_bool();
        }
        PodType::Id => {
            let _ = pod.as_id();
        }
        PodType::Int => {
            let _ = pod.as_int();
        }
        PodType::Long => {
            let _ = pod.as_long();
        }
        PodType::Float => {
            let _ = pod.as_float();
        }
        PodType::Double => {
            let _ = pod.as_double();
        }
        PodType::String => {
            let _ = pod.as_str();
        }
        PodType::Bytes => {
            let _ = pod.as_bytes();
        }
        PodType::Pointer => {
            let _ = pod.as_pointer();
        }
        PodType::Fd => {
            let _ = pod.as_fd();
        }
        PodType::Rectangle => {
            let _ = pod.as_rectangle();
        }
        PodType::Fraction => {
            let _ = pod.as_fraction();
        }
        PodType::Array => {
            if let Ok(arr) = pod.as_array() {
                for e in arr.elements() {
                    let _ = e.len();
                }
            }
        }
        PodType::Struct => {
            if let Ok(iter) = pod.as_struct() {
                for child in iter.flatten() {
                    walk(&child, depth + 1);
                }
            }
        }
        PodType::Object => {
            if let Ok(obj) = pod.as_object() {
                for prop in obj.properties().flatten() {
                    walk(&prop.value, depth + 1);
                }
                for child in obj.children().flatten() {
                    walk(&child, depth + 1);
                }
                let _ = obj.find_prop(1);
            }
        }
        PodType::Property => {
            if let Ok(prop) = pod.as_property() {
                walk(&prop.value, depth + 1);
            }
        }
        PodType::Choice => {
            if let Ok(choice) = pod.as_choice() {
                for e in choice.elements() {
                    let _ = e.len();
                }
            }
            let _ = pod.values();
        }
        PodType::Sequence => {
            if let Ok(seq) = pod.as_sequence() {
                for ctl in seq.controls().flatten() {
                    walk(&ctl.value, depth + 1);
                }
            }
        }
        PodType::None => {}
    }
}

fuzz_target!(|data: &[u8]| {
    if let Ok(pod) = Pod::from_bytes(data) {
        walk(&pod, 0);
        let owned = pod.to_owned();
        let _ = Pod::from_bytes(&owned);
    }
});
