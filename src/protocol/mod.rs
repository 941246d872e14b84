pub mod marshal;
pub mod remap;
pub mod type_map;

pub use marshal::{
    announce_type_table, core_demarshal_error, core_demarshal_update_types, core_marshal_error,
    core_marshal_update_types, core_v0_marshal, DemarshalEntry, ErrorId, InterfaceMarshal,
    MarshalRegistry, Message,
};
pub use remap::{remap_from_v0, remap_to_v0};
pub use type_map::{find_row_by_name, row_to_v2, v2_to_row, CompatTypeMap, TypeRow, TYPE_MAP};
