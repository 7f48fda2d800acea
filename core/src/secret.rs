//! Secret IR (spec §3). The value is held as opaque bytes; only the
//! translator's TLS stage interprets the contents (cert chain / key).

use crate::resource::ObjectRef;
use ahash::AHashMap as HashMap;

#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    pub id: ObjectRef,
    pub data: HashMap<String, Vec<u8>>,
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("id", &self.id)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Permits a cross-namespace reference `(from_group, from_kind) ->
/// (to_group, to_kind, to_name?)` originating from the namespace the
/// grant lives in is the *target* namespace (spec §4.3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceGrant {
    pub namespace: String,
    pub from_group: String,
    pub from_kind: String,
    pub to_group: String,
    pub to_kind: String,
    pub to_name: Option<String>,
}

impl ReferenceGrant {
    pub fn permits(
        &self,
        from_group: &str,
        from_kind: &str,
        to_group: &str,
        to_kind: &str,
        to_name: &str,
    ) -> bool {
        self.from_group == from_group
            && self.from_kind == from_kind
            && self.to_group == to_group
            && self.to_kind == to_kind
            && self
                .to_name
                .as_deref()
                .map(|n| n == to_name)
                .unwrap_or(true)
    }
}
