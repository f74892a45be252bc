//! `serde(with = ...)` helpers bridging `typetag`'s `Box<dyn Trait>` (de)serialization to the
//! `Arc<dyn Trait>` handles used throughout this crate. `typetag::serde` implements `Serialize`
//! for the trait object type itself and `Deserialize` for `Box<dyn Trait>` only; these modules
//! do the `Arc` <-> `Box` conversion at the boundary.

macro_rules! arc_trait_serde {
    ($mod_name:ident, $trait_path:path) => {
        pub(crate) mod $mod_name {
            use std::sync::Arc;

            use serde::{Deserialize, Deserializer, Serialize, Serializer};

            pub(crate) fn serialize<S>(
                value: &Arc<dyn $trait_path>,
                serializer: S,
            ) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                let reference: &dyn $trait_path = value.as_ref();
                reference.serialize(serializer)
            }

            pub(crate) fn deserialize<'de, D>(
                deserializer: D,
            ) -> Result<Arc<dyn $trait_path>, D::Error>
            where
                D: Deserializer<'de>,
            {
                let boxed: Box<dyn $trait_path> = Box::<dyn $trait_path>::deserialize(deserializer)?;
                Ok(Arc::from(boxed))
            }
        }
    };
}

arc_trait_serde!(arc_problem, crate::problem::Problem);
arc_trait_serde!(arc_algorithm, crate::algorithm::Algorithm);
arc_trait_serde!(arc_udi, crate::udi::Udi);
