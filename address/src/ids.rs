//! Well-known program and sysvar addresses.

macro_rules! declare_id {
    ($address:expr) => {
        pub const ID: $crate::Address = $crate::Address::from_str_const($address);

        pub fn id() -> $crate::Address {
            ID
        }

        pub fn check_id(id: &$crate::Address) -> bool {
            id == &ID
        }
    };
}

pub mod system_program {
    declare_id!("11111111111111111111111111111111");
}

pub mod address_lookup_table {
    declare_id!("AddressLookupTab1e1111111111111111111111111");
}

pub mod bpf_loader_upgradeable {
    declare_id!("BPFLoaderUpgradeab1e11111111111111111111111");
}

pub mod sysvar {
    pub mod recent_blockhashes {
        declare_id!("SysvarRecentB1ockHashes11111111111111111111");
    }
}
