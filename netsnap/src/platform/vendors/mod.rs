//! Driver definitions shipped with the crate.

/// `(origin, document)` pairs loaded by [`BuiltinSource`](super::BuiltinSource).
pub const BUILTIN: &[(&str, &str)] = &[
    ("builtin:cisco_ios12.toml", include_str!("cisco_ios12.toml")),
    ("builtin:zpe_nodegrid.toml", include_str!("zpe_nodegrid.toml")),
];
