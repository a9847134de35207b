use wallet_address::Address;

/// Keys loaded from address lookup tables, grouped by access.
///
/// Within each group, keys keep the order of the lookups that produced them:
/// every writable key of the first lookup, then every writable key of the
/// second, and so on.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct AccountKeysFromLookups {
    /// List of addresses for writable loaded accounts
    pub writable: Vec<Address>,
    /// List of addresses for read-only loaded accounts
    pub readonly: Vec<Address>,
}

impl FromIterator<AccountKeysFromLookups> for AccountKeysFromLookups {
    fn from_iter<T: IntoIterator<Item = AccountKeysFromLookups>>(iter: T) -> Self {
        let mut keys = AccountKeysFromLookups::default();
        for AccountKeysFromLookups { writable, readonly } in iter {
            keys.writable.extend(writable);
            keys.readonly.extend(readonly);
        }
        keys
    }
}

impl AccountKeysFromLookups {
    /// Combined length of loaded writable and readonly addresses
    pub fn len(&self) -> usize {
        self.writable.len().saturating_add(self.readonly.len())
    }

    /// Return true if no addresses were loaded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
