//! ASCII route-metadata codec for publishing route tables through a
//! service registry's key/value metadata (e.g. Consul node meta), where
//! each value is capped at a small fixed size.
//!
//! Each route becomes an `"id-flags"` pair; pairs are comma-joined and
//! packed into successive `routes-N` buckets, each kept at or under
//! [`META_VALUE_SIZE`] bytes, exactly as the registry backend this was
//! learned from buckets its route metadata.

use super::table::{RouteEntry, RouteFlags};

pub const META_VALUE_SIZE: usize = 512;
const META_FIELD_ROUTES: &str = "routes";

const FLAG_INTERNAL: i32 = 1 << 0;
const FLAG_STATEFUL: i32 = 1 << 1;
const FLAG_AUTHORIZED: i32 = 1 << 2;

fn flags_to_bits(flags: RouteFlags) -> i32 {
    let mut bits = 0;
    if flags.internal {
        bits |= FLAG_INTERNAL;
    }
    if flags.stateful {
        bits |= FLAG_STATEFUL;
    }
    if flags.authorized {
        bits |= FLAG_AUTHORIZED;
    }
    bits
}

fn bits_to_flags(bits: i32) -> RouteFlags {
    RouteFlags {
        internal: bits & FLAG_INTERNAL != 0,
        stateful: bits & FLAG_STATEFUL != 0,
        authorized: bits & FLAG_AUTHORIZED != 0,
    }
}

/// Pack a route table into `routes-0`, `routes-1`, ... metadata entries,
/// greedily filling each bucket up to [`META_VALUE_SIZE`] bytes.
pub fn marshal_meta_routes(routes: &[RouteEntry]) -> std::collections::BTreeMap<String, String> {
    let mut metas = std::collections::BTreeMap::new();
    let mut items = String::new();

    for route in routes {
        let val = format!("{}-{}", route.id, flags_to_bits(route.flags));

        let size = if items.is_empty() {
            val.len()
        } else {
            items.len() + 1 + val.len()
        };

        if size <= META_VALUE_SIZE {
            if items.is_empty() {
                items = val.clone();
            } else {
                items.push(',');
                items.push_str(&val);
            }
        }

        if size >= META_VALUE_SIZE {
            let key = format!("{}-{}", META_FIELD_ROUTES, metas.len());
            metas.insert(key, items.clone());
        }

        match size.cmp(&META_VALUE_SIZE) {
            std::cmp::Ordering::Less => {}
            std::cmp::Ordering::Greater => items = val,
            std::cmp::Ordering::Equal => items = String::new(),
        }
    }

    if !items.is_empty() {
        let key = format!("{}-{}", META_FIELD_ROUTES, metas.len());
        metas.insert(key, items);
    }

    metas
}

/// Inverse of [`marshal_meta_routes`]. Malformed fields or items are
/// skipped rather than rejected, matching the source registry's tolerant
/// decode (a peer on a newer version may publish fields this one doesn't
/// understand).
pub fn unmarshal_meta_routes(metas: &std::collections::BTreeMap<String, String>) -> Vec<RouteEntry> {
    let mut routes = Vec::new();

    for (field, items) in metas {
        let mut parts = field.splitn(2, '-');
        let (Some(prefix), Some(_)) = (parts.next(), parts.next()) else {
            continue;
        };
        if prefix != META_FIELD_ROUTES {
            continue;
        }

        for item in items.split(',') {
            if item.is_empty() {
                continue;
            }
            let mut val = item.splitn(2, '-');
            let (Some(id_str), Some(bits_str)) = (val.next(), val.next()) else {
                continue;
            };
            let (Ok(id), Ok(bits)) = (id_str.parse::<i32>(), bits_str.parse::<i32>()) else {
                continue;
            };
            routes.push(RouteEntry {
                id,
                flags: bits_to_flags(bits),
            });
        }
    }

    routes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i32, internal: bool, stateful: bool, authorized: bool) -> RouteEntry {
        RouteEntry {
            id,
            flags: RouteFlags {
                internal,
                stateful,
                authorized,
            },
        }
    }

    #[test]
    fn roundtrip_small_table() {
        let routes = vec![
            entry(1, false, true, true),
            entry(2, true, false, false),
            entry(3, false, false, true),
        ];
        let metas = marshal_meta_routes(&routes);
        assert_eq!(metas.len(), 1);
        let decoded = unmarshal_meta_routes(&metas);
        assert_eq!(decoded.len(), routes.len());
        for original in &routes {
            let found = decoded.iter().find(|r| r.id == original.id).unwrap();
            assert_eq!(found.flags, original.flags);
        }
    }

    #[test]
    fn large_table_splits_across_buckets() {
        let routes: Vec<RouteEntry> = (0..300).map(|i| entry(i, i % 2 == 0, true, false)).collect();
        let metas = marshal_meta_routes(&routes);
        assert!(metas.len() > 1, "expected split across multiple routes-N buckets");
        for value in metas.values() {
            assert!(value.len() <= META_VALUE_SIZE);
        }

        let decoded = unmarshal_meta_routes(&metas);
        assert_eq!(decoded.len(), routes.len());
        for original in &routes {
            let found = decoded.iter().find(|r| r.id == original.id).unwrap();
            assert_eq!(found.flags, original.flags);
        }
    }

    #[test]
    fn unmarshal_ignores_unrelated_fields() {
        let mut metas = std::collections::BTreeMap::new();
        metas.insert("instance-id".to_string(), "abc".to_string());
        metas.insert("routes-0".to_string(), "1-3,2-0".to_string());
        let decoded = unmarshal_meta_routes(&metas);
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn unmarshal_skips_malformed_items() {
        let mut metas = std::collections::BTreeMap::new();
        metas.insert("routes-0".to_string(), "1-3,garbage,2-0".to_string());
        let decoded = unmarshal_meta_routes(&metas);
        assert_eq!(decoded.len(), 2);
    }
}
