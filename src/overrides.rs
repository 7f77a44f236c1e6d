use crate::error::{Error, Result};
use crate::key::ResourceKey;
use crate::pack::Pack;
use crate::pack::document::JsonDocument;
use crate::store::IdentifierStore;
use log::{debug, warn};
use serde_json::{Map, Value, json};

pub const OVERRIDES: &str = "overrides";
pub const PREDICATE: &str = "predicate";
pub const MODEL: &str = "model";
pub const CUSTOM_MODEL_DATA: &str = "custom_model_data";

/// Upper bound on fresh values drawn while skipping occupied ones.
pub const MAX_COLLISION_RETRIES: u32 = 65_536;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideOutcome {
    /// A new entry was written with this value.
    Added(i32),
    /// The model already had a plain entry for the target with this value.
    AlreadyPresent(i32),
}

impl OverrideOutcome {
    pub const fn value(self) -> i32 {
        match self {
            Self::Added(v) | Self::AlreadyPresent(v) => v,
        }
    }
}

/// Read-only view of one element of an `overrides` array.
#[derive(Debug, Clone, Copy)]
pub struct OverrideEntry<'a>(&'a Value);

impl<'a> OverrideEntry<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self(value)
    }

    pub fn predicate(&self) -> Option<&'a Map<String, Value>> {
        self.0.get(PREDICATE)?.as_object()
    }

    pub fn model(&self) -> Option<&'a str> {
        self.0.get(MODEL)?.as_str()
    }

    pub fn custom_model_data(&self) -> Option<i32> {
        let raw = self.predicate()?.get(CUSTOM_MODEL_DATA)?;
        raw.as_i64()
            .or_else(|| raw.as_f64().map(|f| f as i64))
            .and_then(|v| i32::try_from(v).ok())
    }

    /// Custom model data is the only predicate.
    pub fn is_plain(&self) -> bool {
        self.predicate().is_some_and(|p| p.len() == 1) && self.custom_model_data().is_some()
    }
}

/// Sort entries carrying custom model data by value; the others keep their slots.
fn sort_by_custom_model_data(overrides: &mut [Value]) {
    let slots: Vec<usize> = (0..overrides.len())
        .filter(|&i| OverrideEntry(&overrides[i]).custom_model_data().is_some())
        .collect();
    let mut keyed: Vec<(i32, Value)> = slots
        .iter()
        .map(|&i| {
            let value = std::mem::take(&mut overrides[i]);
            (OverrideEntry(&value).custom_model_data().unwrap_or(0), value)
        })
        .collect();
    keyed.sort_by_key(|(v, _)| *v);
    for (slot, (_, value)) in slots.into_iter().zip(keyed) {
        overrides[slot] = value;
    }
}

/// Open `base`'s model in `pack`, copying it from `fallback` first if needed.
fn load_base_model(pack: &mut Pack, fallback: Option<&Pack>, base: &ResourceKey) -> Result<JsonDocument> {
    let path = base.model_path();
    if !pack.exists(&path) {
        let bytes = match fallback {
            Some(fallback) if fallback.exists(&path) => fallback.read(&path)?,
            _ => {
                return Err(Error::not_found(format!(
                    "the model {base} (in this pack or the vanilla assets)"
                )));
            }
        };
        pack.write(&path, &bytes)?;
        debug!("Copied base model {base} from the vanilla assets.");
    }
    pack.read_json(&path)
}

/// The client picks the first matching override, so `overrides` must stay
/// sorted by custom model data.
pub struct OverrideInjector<'a> {
    pack: &'a mut Pack,
    fallback: Option<&'a Pack>,
    store: Option<&'a mut IdentifierStore>,
}

impl<'a> OverrideInjector<'a> {
    /// `fallback` supplies base models missing from `pack`; `store` is
    /// needed only for [`add_custom_model_data`](Self::add_custom_model_data).
    pub fn new(
        pack: &'a mut Pack,
        fallback: Option<&'a Pack>,
        store: Option<&'a mut IdentifierStore>,
    ) -> Self {
        Self {
            pack,
            fallback,
            store,
        }
    }

    /// Redirect `base` to `target` through a custom-model-data predicate and
    /// return the value an item needs to select `target`.
    ///
    /// The store is updated in memory only; call
    /// [`IdentifierStore::save`] once the batch is done.
    pub fn add_custom_model_data(
        &mut self,
        base: &ResourceKey,
        target: &ResourceKey,
    ) -> Result<OverrideOutcome> {
        let Self {
            pack,
            fallback,
            store,
        } = self;
        let Some(store) = store.as_deref_mut() else {
            return Err(Error::IllegalState(
                "custom model data requires an identifier store".to_string(),
            ));
        };
        let mut doc = load_base_model(pack, *fallback, base)?;
        let target_str = target.to_string();
        let overrides = doc.array_mut(OVERRIDES)?;

        for entry in overrides.iter().map(OverrideEntry::new) {
            if entry.is_plain() && entry.model() == Some(target_str.as_str()) {
                let Some(value) = entry.custom_model_data() else {
                    continue;
                };
                store.set(target, value);
                return Ok(OverrideOutcome::AlreadyPresent(value));
            }
        }

        let mut value = if store.has(target) {
            store.get(target)?
        } else {
            store.next()
        };

        let mut retries = 0u32;
        while let Some(occupant) = overrides
            .iter()
            .map(OverrideEntry::new)
            .find(|e| e.custom_model_data() == Some(value))
        {
            warn!(
                "Occupied custom model data value {value} existed for {} while trying to add {target}",
                occupant.model().unwrap_or("<no model>")
            );
            retries += 1;
            if retries > MAX_COLLISION_RETRIES {
                return Err(Error::Constraint(format!(
                    "no free custom model data value for {target} on {base} after {MAX_COLLISION_RETRIES} attempts"
                )));
            }
            value = store.next();
        }

        store.set(target, value);
        overrides.push(json!({
            PREDICATE: { CUSTOM_MODEL_DATA: value },
            MODEL: target_str,
        }));
        sort_by_custom_model_data(overrides);

        pack.write_json(&doc)?;
        debug!("Added custom model data {value} on {base} -> {target}.");
        Ok(OverrideOutcome::Added(value))
    }

    /// Append an override with an arbitrary predicate. No allocation,
    /// deduplication or sorting.
    pub fn add_override(
        &mut self,
        base: &ResourceKey,
        target: &ResourceKey,
        predicate: Map<String, Value>,
    ) -> Result<()> {
        let mut doc = load_base_model(self.pack, self.fallback, base)?;
        doc.array_mut(OVERRIDES)?.push(json!({
            PREDICATE: predicate,
            MODEL: target.to_string(),
        }));
        self.pack.write_json(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::{CUSTOM_MODEL_DATA, OVERRIDES, OverrideEntry, OverrideInjector, OverrideOutcome};
    use crate::error::Error;
    use crate::key::ResourceKey;
    use crate::pack::Pack;
    use crate::store::IdentifierStore;
    use serde_json::{Value, json};

    struct Fixture {
        _dir: tempfile::TempDir,
        pack: Pack,
        vanilla: Pack,
        store: IdentifierStore,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let pack = Pack::open_directory(dir.path().join("pack")).unwrap();
        let mut vanilla = Pack::open_directory(dir.path().join("vanilla")).unwrap();
        vanilla
            .write(
                "assets/minecraft/models/item/stick.json",
                br#"{"parent":"item/handheld","textures":{"layer0":"item/stick"}}"#,
            )
            .unwrap();
        let store = IdentifierStore::load(dir.path().join("cmd.json")).unwrap();
        Fixture {
            _dir: dir,
            pack,
            vanilla,
            store,
        }
    }

    fn key(s: &str) -> ResourceKey {
        s.parse().unwrap()
    }

    fn overrides(pack: &Pack, base: &ResourceKey) -> Vec<Value> {
        let doc = pack.read_json(&base.model_path()).unwrap();
        doc.array(OVERRIDES).unwrap().cloned().unwrap_or_default()
    }

    fn values(list: &[Value]) -> Vec<i32> {
        list.iter()
            .filter_map(|v| OverrideEntry::new(v).custom_model_data())
            .collect()
    }

    #[test]
    fn copies_base_from_vanilla_and_allocates() {
        let mut f = fixture();
        let base = key("item/stick");
        let mut inj = OverrideInjector::new(&mut f.pack, Some(&f.vanilla), Some(&mut f.store));
        let out = inj.add_custom_model_data(&base, &key("mypack:item/wand")).unwrap();
        assert_eq!(out, OverrideOutcome::Added(1));

        let doc = f.pack.read_json(&base.model_path()).unwrap();
        assert_eq!(doc.root()["parent"], "item/handheld", "base content copied verbatim");
        assert_eq!(f.store.get(&key("mypack:item/wand")).unwrap(), 1);
    }

    #[test]
    fn adding_twice_is_idempotent() {
        let mut f = fixture();
        let base = key("item/stick");
        let target = key("mypack:item/wand");
        let mut inj = OverrideInjector::new(&mut f.pack, Some(&f.vanilla), Some(&mut f.store));
        let first = inj.add_custom_model_data(&base, &target).unwrap();
        let second = inj.add_custom_model_data(&base, &target).unwrap();
        assert_eq!(first.value(), second.value());
        assert_eq!(second, OverrideOutcome::AlreadyPresent(first.value()));

        let list = overrides(&f.pack, &base);
        let for_target = list
            .iter()
            .filter(|v| OverrideEntry::new(v).model() == Some("mypack:item/wand"))
            .count();
        assert_eq!(for_target, 1, "exactly one entry per target");
    }

    #[test]
    fn repairs_store_drift_from_existing_entry() {
        let mut f = fixture();
        f.pack
            .write(
                "assets/minecraft/models/item/stick.json",
                br#"{"overrides":[{"predicate":{"custom_model_data":7},"model":"mypack:item/wand"}]}"#,
            )
            .unwrap();
        let mut inj = OverrideInjector::new(&mut f.pack, None, Some(&mut f.store));
        let out = inj
            .add_custom_model_data(&key("item/stick"), &key("mypack:item/wand"))
            .unwrap();
        assert_eq!(out, OverrideOutcome::AlreadyPresent(7));
        assert_eq!(f.store.get(&key("mypack:item/wand")).unwrap(), 7);
    }

    #[test]
    fn entry_with_extra_predicates_is_not_reused() {
        let mut f = fixture();
        f.pack
            .write(
                "assets/minecraft/models/item/stick.json",
                br#"{"overrides":[{"predicate":{"custom_model_data":1,"damage":0.5},"model":"mypack:item/wand"}]}"#,
            )
            .unwrap();
        let mut inj = OverrideInjector::new(&mut f.pack, None, Some(&mut f.store));
        let out = inj
            .add_custom_model_data(&key("item/stick"), &key("mypack:item/wand"))
            .unwrap();
        assert_eq!(out, OverrideOutcome::Added(2), "value 1 is occupied by the foreign entry");
    }

    #[test]
    fn skips_values_taken_by_foreign_entries() {
        let mut f = fixture();
        f.pack
            .write(
                "assets/minecraft/models/item/stick.json",
                br#"{"overrides":[
                    {"predicate":{"custom_model_data":1},"model":"other:item/a"},
                    {"predicate":{"custom_model_data":2},"model":"other:item/b"}
                ]}"#,
            )
            .unwrap();
        let mut inj = OverrideInjector::new(&mut f.pack, None, Some(&mut f.store));
        let out = inj
            .add_custom_model_data(&key("item/stick"), &key("mypack:item/wand"))
            .unwrap();
        assert_eq!(out, OverrideOutcome::Added(3));
        assert_eq!(f.store.get(&key("mypack:item/wand")).unwrap(), 3);
    }

    #[test]
    fn keeps_entries_sorted_and_leaves_others_in_place() {
        let mut f = fixture();
        f.pack
            .write(
                "assets/minecraft/models/item/stick.json",
                br#"{"overrides":[
                    {"predicate":{"pulling":1},"model":"minecraft:item/stick_pull"},
                    {"predicate":{"custom_model_data":50},"model":"other:item/high"}
                ]}"#,
            )
            .unwrap();
        // A stale allocation from an earlier run that sits below the foreign entry.
        f.store.set(&key("mypack:item/c"), 60);
        let base = key("item/stick");
        let mut inj = OverrideInjector::new(&mut f.pack, None, Some(&mut f.store));
        for t in ["mypack:item/a", "mypack:item/b", "mypack:item/c"] {
            inj.add_custom_model_data(&base, &key(t)).unwrap();
        }

        let list = overrides(&f.pack, &base);
        let vals = values(&list);
        assert!(vals.windows(2).all(|w| w[0] <= w[1]), "not sorted: {vals:?}");
        assert_eq!(
            OverrideEntry::new(&list[0]).model(),
            Some("minecraft:item/stick_pull"),
            "entries without custom model data keep their slot"
        );
        assert_eq!(list.len(), 5);
    }

    #[test]
    fn missing_base_is_not_found() {
        let mut f = fixture();
        let mut inj = OverrideInjector::new(&mut f.pack, Some(&f.vanilla), Some(&mut f.store));
        let err = inj
            .add_custom_model_data(&key("item/nonexistent"), &key("mypack:item/x"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn requires_store() {
        let mut f = fixture();
        let mut inj = OverrideInjector::new(&mut f.pack, Some(&f.vanilla), None);
        let err = inj
            .add_custom_model_data(&key("item/stick"), &key("mypack:item/x"))
            .unwrap_err();
        assert!(matches!(err, Error::IllegalState(_)));
    }

    #[test]
    fn plain_override_appends_without_sorting() {
        let mut f = fixture();
        let base = key("item/stick");
        let mut inj = OverrideInjector::new(&mut f.pack, Some(&f.vanilla), None);
        let mut pred = serde_json::Map::new();
        pred.insert("damage".into(), json!(0.25));
        inj.add_override(&base, &key("mypack:item/broken"), pred.clone())
            .unwrap();
        inj.add_override(&base, &key("mypack:item/broken"), pred).unwrap();

        let list = overrides(&f.pack, &base);
        assert_eq!(list.len(), 2, "no deduplication");
        assert!(list[0]["predicate"].get(CUSTOM_MODEL_DATA).is_none());
    }
}
