use cache_diff::CacheDiff;
use libcnb::generic::GenericMetadata;
use libcnb::layer::{InvalidMetadataAction, RestoredLayerAction};
use magic_migrate::TryMigrate;

pub(crate) mod config;
pub(crate) mod dist;
pub(crate) mod profile;
pub(crate) mod tools;

/// Migrate metadata written by an older layer version. Layers whose metadata
/// can't be migrated are deleted.
pub(crate) fn invalid_metadata_action<M>(
    invalid: &GenericMetadata,
) -> (InvalidMetadataAction<M>, String)
where
    M: TryMigrate,
{
    let migrated = invalid
        .as_ref()
        .and_then(|table| toml::to_string(table).ok())
        .and_then(|contents| M::try_from_str_migrations(&contents))
        .and_then(Result::ok);

    match migrated {
        Some(metadata) => (
            InvalidMetadataAction::ReplaceMetadata(metadata),
            String::from("Migrated layer metadata"),
        ),
        None => (
            InvalidMetadataAction::DeleteLayer,
            String::from("Clearing layer with unreadable metadata"),
        ),
    }
}

/// Keep a restored layer when its metadata matches `now`, otherwise delete it
/// and list what changed.
pub(crate) fn restored_layer_action<M>(
    now: &M,
    old: &M,
    name: &str,
) -> (RestoredLayerAction, String)
where
    M: CacheDiff,
{
    let diff = now.diff(old);
    if diff.is_empty() {
        (RestoredLayerAction::KeepLayer, format!("Using cached {name}"))
    } else {
        (
            RestoredLayerAction::DeleteLayer,
            format!("Clearing cached {name} due to {}", diff.join(", ")),
        )
    }
}
