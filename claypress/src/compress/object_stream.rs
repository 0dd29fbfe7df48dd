use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::{CbError, Result},
    pdf::{
        document::{dict_types, filters, K_FIRST, K_FILTER, K_STREAM_OBJECT_COUNT, K_TYPE},
        stream::flate_encode,
        Dictionary, Name, Object, ObjectKey, Stream,
    },
    pool::ObjectPool,
    simple_encode::object::ObjectEncoder,
};

use super::TableResolver;

/// One packed object. `offset` is relative to `First`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStreamMember {
    pub key: ObjectKey,
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectStream {
    pub key: ObjectKey,
    /// In the order of the header and of the payload.
    pub members: Vec<ObjectStreamMember>,
    pub stream: Stream,
}

/// Pack `eligible` into object streams of at most `batch_size` objects each.
///
/// Members are taken in ascending key order. Every container receives a fresh
/// identity from `pool`.
pub fn pack(
    objects: &BTreeMap<ObjectKey, Object>,
    eligible: &BTreeSet<ObjectKey>,
    batch_size: usize,
    pool: &mut ObjectPool,
) -> Result<Vec<ObjectStream>> {
    let keys: Vec<ObjectKey> = eligible.iter().copied().collect();
    let mut containers = Vec::with_capacity(keys.len() / batch_size.max(1) + 1);

    for batch in keys.chunks(batch_size.max(1)) {
        let (members, payload, first) = {
            let mut resolver = TableResolver::new(pool);
            let mut encoder = ObjectEncoder::new(&mut resolver);
            let mut body = Vec::new();
            let mut members = Vec::with_capacity(batch.len());
            for key in batch {
                let object = objects.get(key).ok_or(CbError::UnresolvedReference(*key))?;
                if !body.is_empty() {
                    body.push(b'\n');
                }
                let offset = body.len();
                encoder.encode_value(object, &mut body)?;
                members.push(ObjectStreamMember {
                    key: *key,
                    offset,
                    length: body.len() - offset,
                });
            }

            let header = members
                .iter()
                .map(|m| format!("{} {}", m.key.number, m.offset))
                .collect::<Vec<_>>()
                .join(" ")
                + "\n";
            let mut payload = header.into_bytes();
            let first = payload.len();
            payload.extend_from_slice(&body);
            (members, payload, first)
        };

        let node = pool.anonymous();
        let key = pool.allocate(None, node)?;
        log::debug!("object stream {} holds {} objects", key, members.len());

        let mut dictionary = Dictionary::new();
        dictionary.insert(Name::from(K_TYPE), Name::from(dict_types::OBJECT_STREAM).into());
        dictionary.insert(Name::from(K_STREAM_OBJECT_COUNT), Object::Integer(members.len() as i64));
        dictionary.insert(Name::from(K_FIRST), Object::Integer(first as i64));
        dictionary.insert(Name::from(K_FILTER), Name::from(filters::FLATE_DECODE).into());

        containers.push(ObjectStream {
            key,
            members,
            stream: Stream::new(dictionary, flate_encode(&payload)?),
        });
    }

    Ok(containers)
}

#[cfg(test)]
mod tests {
    use crate::{
        pdf::{dictionary, stream::flate_decode, CbString},
        pool::NodeKey,
    };

    use super::*;

    /// `count` dictionaries numbered from 1, all registered in the pool.
    fn fixture(count: u32) -> (BTreeMap<ObjectKey, Object>, BTreeSet<ObjectKey>, ObjectPool) {
        let mut pool = ObjectPool::new(0);
        let mut objects = BTreeMap::new();
        for n in 1..=count {
            let key = ObjectKey::new(n, 0);
            pool.allocate(Some(key), NodeKey::Source(key)).unwrap();
            let next = ObjectKey::new(n % count + 1, 0);
            objects.insert(
                key,
                Object::from(dictionary([
                    ("Index", Object::from(n)),
                    ("Next", next.into()),
                    ("Title", CbString::from("x(y").into()),
                ])),
            );
        }
        let eligible = objects.keys().copied().collect();
        (objects, eligible, pool)
    }

    #[test]
    fn five_objects_in_batches_of_two() {
        let (objects, eligible, mut pool) = fixture(5);
        let containers = pack(&objects, &eligible, 2, &mut pool).unwrap();
        let counts: Vec<_> = containers.iter().map(|c| c.members.len()).collect();
        assert_eq!(counts, vec![2, 2, 1]);

        // containers are numbered after every packed object
        let numbers: Vec<_> = containers.iter().map(|c| c.key.number).collect();
        assert_eq!(numbers, vec![6, 7, 8]);

        let packed: Vec<_> = containers
            .iter()
            .flat_map(|c| c.members.iter().map(|m| m.key))
            .collect();
        assert_eq!(packed, eligible.iter().copied().collect::<Vec<_>>());
    }

    #[test]
    fn header_offsets_slice_the_members() {
        let (objects, eligible, mut pool) = fixture(3);
        let containers = pack(&objects, &eligible, 200, &mut pool).unwrap();
        assert_eq!(containers.len(), 1);
        let container = &containers[0];

        let dict = &container.stream.dictionary;
        assert_eq!(dict.get(K_TYPE), Some(&Object::from(Name::from_str("ObjStm"))));
        assert_eq!(dict.get(K_STREAM_OBJECT_COUNT), Some(&Object::Integer(3)));
        let first = dict.get(K_FIRST).and_then(Object::integer).unwrap() as usize;

        let payload = flate_decode(&container.stream.data).unwrap();
        let header = std::str::from_utf8(&payload[..first]).unwrap();
        assert!(header.ends_with('\n'));
        let numbers: Vec<usize> = header
            .split_whitespace()
            .map(|n| n.parse().unwrap())
            .collect();
        assert_eq!(numbers.len(), 6);

        for (pair, key) in numbers.chunks(2).zip(eligible.iter()) {
            assert_eq!(pair[0], key.number as usize);
            let member = container.members.iter().find(|m| m.key == *key).unwrap();
            assert_eq!(pair[1], member.offset);

            let mut resolver = TableResolver::new(&pool);
            let mut expected = Vec::new();
            ObjectEncoder::new(&mut resolver)
                .encode_value(&objects[key], &mut expected)
                .unwrap();
            let start = first + member.offset;
            assert_eq!(&payload[start..start + member.length], &expected[..]);
        }
    }

    #[test]
    fn reference_to_unknown_object_fails() {
        let (mut objects, eligible, mut pool) = fixture(1);
        objects.insert(
            ObjectKey::new(1, 0),
            Object::from(vec![Object::Reference(ObjectKey::new(77, 0))]),
        );
        assert!(matches!(
            pack(&objects, &eligible, 10, &mut pool),
            Err(CbError::UnresolvedReference(key)) if key == ObjectKey::new(77, 0)
        ));
    }
}
