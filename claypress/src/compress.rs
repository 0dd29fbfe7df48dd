//! Compression pass: walk the object graph once, give every indirect object
//! its output identity, run the content compressors and sort the objects into
//! those written at the top level and those packed into object streams.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use fnv::FnvHashMap;

use crate::{
    error::{CbError, Result},
    options::CompressParameters,
    pdf::{document::K_LENGTH, Array, Dictionary, Document, Object, ObjectKey, Stream},
    pool::{NodeKey, ObjectPool},
    simple_encode::object::ReferenceResolver,
};

use self::{
    compressor::{CompressError, Compressor, StreamCompressor},
    image::ImageCompressor,
    traversal::{Positions, TraversedNode},
};

pub mod compressor;
pub mod image;
pub mod object_stream;
pub mod traversal;

/// Result of the compression pass. Every reference in `objects` carries an
/// output identity registered in `pool`.
#[derive(Debug)]
pub struct CompressedGraph {
    pub objects: BTreeMap<ObjectKey, Object>,
    /// Written as indirect objects in the file body.
    pub top_level: BTreeSet<ObjectKey>,
    /// Packed into object streams.
    pub object_stream_objects: BTreeSet<ObjectKey>,
    /// Top level objects written without encryption.
    pub unencrypted: BTreeSet<ObjectKey>,
    pub root: ObjectKey,
    pub info: Option<ObjectKey>,
    pub encrypt: Option<ObjectKey>,
    pub pool: ObjectPool,
}

/// An indirect object waiting to be traversed.
struct Pending {
    key: ObjectKey,
    node: NodeKey,
    position: usize,
}

pub struct CompressionPool<'a> {
    document: &'a Document,
    compressors: Vec<Box<dyn Compressor>>,
    pool: ObjectPool,
    positions: Positions,
    queue: VecDeque<Pending>,
    /// Direct objects that were promoted to indirect ones.
    anonymous: FnvHashMap<NodeKey, Object>,
    objects: BTreeMap<ObjectKey, Object>,
    top_level: BTreeSet<ObjectKey>,
    object_stream_objects: BTreeSet<ObjectKey>,
    unencrypted: BTreeSet<ObjectKey>,
    /// Currently traversing objects reached from the encryption dictionary.
    encrypt_pass: bool,
    /// The encryption dictionary, when it is an indirect object.
    encrypt_node: Option<NodeKey>,
    /// Identity handed out for the encryption dictionary before its own pass.
    deferred_encrypt: Option<(ObjectKey, NodeKey)>,
}

impl<'a> CompressionPool<'a> {
    pub fn new(document: &'a Document, params: &CompressParameters) -> Self {
        let mut compressors: Vec<Box<dyn Compressor>> = Vec::new();
        if params.compress_streams() {
            compressors.push(Box::new(StreamCompressor));
        }
        if params.compress_images() {
            compressors.push(Box::new(ImageCompressor::new(params.image_quality())));
        }

        Self {
            document,
            compressors,
            pool: ObjectPool::new(document.highest_object_number),
            positions: Positions::default(),
            queue: VecDeque::new(),
            anonymous: FnvHashMap::default(),
            objects: BTreeMap::new(),
            top_level: BTreeSet::new(),
            object_stream_objects: BTreeSet::new(),
            unencrypted: BTreeSet::new(),
            encrypt_pass: false,
            encrypt_node: None,
            deferred_encrypt: None,
        }
    }

    pub fn run(mut self) -> Result<CompressedGraph> {
        let document = self.document;
        self.encrypt_node = match &document.encrypt {
            Some(Object::Reference(r)) => NodeKey::of_reference(document, *r),
            _ => None,
        };

        let root = self.claim_root(&document.root)?.ok_or(CbError::MissingRoot)?;
        self.top_level.insert(root);
        let info = match &document.info {
            Some(info) => self.claim_root(info)?,
            None => None,
        };
        if let Some(info) = info {
            self.top_level.insert(info);
        }
        self.traverse()?;

        self.encrypt_pass = true;
        let encrypt = match &document.encrypt {
            Some(encrypt) => self.claim_root(encrypt)?,
            None => None,
        };
        if let Some(encrypt) = encrypt {
            self.top_level.insert(encrypt);
            self.unencrypted.insert(encrypt);
        }
        // referenced from the body, so it was claimed but never queued
        if let Some((key, node)) = self.deferred_encrypt.take() {
            self.enqueue(key, node, None);
        }
        self.traverse()?;

        log::debug!(
            "{} objects: {} top level, {} in object streams",
            self.objects.len(),
            self.top_level.len(),
            self.object_stream_objects.len()
        );

        Ok(CompressedGraph {
            objects: self.objects,
            top_level: self.top_level,
            object_stream_objects: self.object_stream_objects,
            unencrypted: self.unencrypted,
            root,
            info,
            encrypt,
            pool: self.pool,
        })
    }

    /// Identity of a trailer entry. Direct composites are promoted.
    fn claim_root(&mut self, object: &Object) -> Result<Option<ObjectKey>> {
        match object {
            Object::Reference(r) => self.claim_reference(*r, None),
            direct if direct.is_composite() => self.promote(direct, None).map(Some),
            Object::Null => Ok(None),
            other => {
                log::warn!("Trailer entry {} is not an object, ignoring it", other);
                Ok(None)
            }
        }
    }

    /// Identity of the object `reference` points to. New targets are queued,
    /// except the encryption dictionary which waits for its own pass.
    /// Dangling references have no identity.
    fn claim_reference(&mut self, reference: ObjectKey, parent: Option<usize>) -> Result<Option<ObjectKey>> {
        let Some(node) = NodeKey::of_reference(self.document, reference) else {
            log::warn!("Dangling reference {}, writing null", reference);
            return Ok(None);
        };

        if let Some(key) = self.pool.lookup_key(node) {
            if let Some(parent) = parent {
                if self.positions.is_ancestor(key, parent) {
                    log::trace!("cycle back to {} from {:?}", key, self.positions.get(parent));
                }
            }
            return Ok(Some(key));
        }

        let requested = match node {
            NodeKey::Source(target) => Some(target),
            NodeKey::Anonymous(_) => None,
        };
        let key = self.pool.allocate(requested, node)?;
        if !self.encrypt_pass && self.encrypt_node == Some(node) {
            log::debug!("{} is the encryption dictionary, deferring it", key);
            self.deferred_encrypt = Some((key, node));
        } else {
            self.enqueue(key, node, parent);
        }
        Ok(Some(key))
    }

    /// Give a direct object its own identity.
    fn promote(&mut self, object: &Object, parent: Option<usize>) -> Result<ObjectKey> {
        let node = self.pool.anonymous();
        let key = self.pool.allocate(None, node)?;
        self.anonymous.insert(node, object.clone());
        self.enqueue(key, node, parent);
        Ok(key)
    }

    fn enqueue(&mut self, key: ObjectKey, node: NodeKey, parent: Option<usize>) {
        let position = self.positions.push(TraversedNode { key, parent });
        self.queue.push_back(Pending { key, node, position });
    }

    fn traverse(&mut self) -> Result<()> {
        while let Some(Pending { key, node, position }) = self.queue.pop_front() {
            let object = match node {
                NodeKey::Source(source) => self
                    .document
                    .dereference(source)
                    .map(|(_, o)| o.clone())
                    .unwrap_or_default(),
                NodeKey::Anonymous(_) => self.anonymous.remove(&node).unwrap_or_default(),
            };

            let object = self.apply_compressors(object, position);
            let object = self.rewrite(&object, position, false)?;
            self.classify(key, node, &object);
            self.objects.insert(key, object);
        }
        Ok(())
    }

    fn apply_compressors(&self, mut object: Object, position: usize) -> Object {
        let Some(traversed) = self.positions.get(position) else {
            return object;
        };
        for compressor in self.compressors.iter() {
            if !compressor.is_compressible(&object, traversed) {
                continue;
            }
            match compressor.compress(self.document, &object, traversed) {
                Ok(compressed) => object = compressed,
                Err(CompressError::NoGain) => {
                    log::debug!("Keeping {}, compressed form is not smaller", traversed.key)
                }
                Err(err) => log::warn!("Could not compress {}: {}", traversed.key, err),
            }
        }
        object
    }

    /// Copy of `object` with references re-stamped to output identities and
    /// direct composites promoted where they may be shared.
    fn rewrite(&mut self, object: &Object, position: usize, in_stream_dictionary: bool) -> Result<Object> {
        let rewritten = match object {
            Object::Reference(r) => self
                .claim_reference(*r, Some(position))?
                .map_or(Object::Null, Object::Reference),
            Object::Array(array) => {
                let mut items = Array::new();
                for item in array.iter() {
                    items.push(self.rewrite_child(item, position, in_stream_dictionary)?);
                }
                Object::Array(items)
            }
            Object::Dictionary(dict) => {
                Object::Dictionary(self.rewrite_dictionary(dict, position, in_stream_dictionary)?)
            }
            Object::Stream(stream) => {
                let mut dictionary = self.rewrite_dictionary(&stream.dictionary, position, true)?;
                // recomputed on output
                dictionary.remove(K_LENGTH);
                Object::Stream(Stream {
                    dictionary,
                    data: stream.data.clone(),
                })
            }
            leaf => leaf.clone(),
        };
        Ok(rewritten)
    }

    fn rewrite_dictionary(
        &mut self,
        dict: &Dictionary,
        position: usize,
        in_stream_dictionary: bool,
    ) -> Result<Dictionary> {
        let mut rewritten = Dictionary::new();
        for (key, value) in dict.iter() {
            if in_stream_dictionary && &key[..] == K_LENGTH {
                continue;
            }
            let value = self.rewrite_child(value, position, in_stream_dictionary)?;
            if !value.is_null() {
                rewritten.insert(key.clone(), value);
            }
        }
        Ok(rewritten)
    }

    fn rewrite_child(&mut self, child: &Object, position: usize, in_stream_dictionary: bool) -> Result<Object> {
        match child {
            // streams can't be direct objects
            Object::Stream(_) => {
                let key = self.promote(child, Some(position))?;
                Ok(Object::Reference(key))
            }
            Object::Array(_) | Object::Dictionary(_) if !in_stream_dictionary && !self.encrypt_pass => {
                let key = self.promote(child, Some(position))?;
                Ok(Object::Reference(key))
            }
            other => self.rewrite(other, position, in_stream_dictionary),
        }
    }

    fn classify(&mut self, key: ObjectKey, node: NodeKey, object: &Object) {
        let is_encrypt = self.encrypt_node == Some(node);
        let top_level = self.encrypt_pass
            || is_encrypt
            || matches!(object, Object::Stream(_))
            || key.generation != 0
            || self.top_level.contains(&key);
        if self.encrypt_pass || is_encrypt {
            self.unencrypted.insert(key);
        }
        if top_level {
            self.top_level.insert(key);
        } else {
            self.object_stream_objects.insert(key);
        }
    }
}

/// Resolves references of a graph whose references already carry their
/// output identity.
pub(crate) struct TableResolver<'p> {
    pool: &'p ObjectPool,
}

impl<'p> TableResolver<'p> {
    pub(crate) fn new(pool: &'p ObjectPool) -> Self {
        Self { pool }
    }
}

impl ReferenceResolver for TableResolver<'_> {
    fn resolve(&mut self, reference: ObjectKey) -> Result<Option<ObjectKey>> {
        if self.pool.contains_key(reference) {
            Ok(Some(reference))
        } else {
            Err(CbError::UnresolvedReference(reference))
        }
    }

    fn promote(&mut self, _object: &Object) -> Result<ObjectKey> {
        Err(CbError::DirectStream)
    }
}

#[cfg(test)]
mod tests {
    use crate::pdf::{dictionary, Name};

    use super::*;

    fn params() -> CompressParameters {
        CompressParameters::default()
    }

    #[test]
    fn two_node_cycle() {
        let mut doc = Document::new();
        let a = ObjectKey::new(1, 0);
        let b = ObjectKey::new(2, 0);
        doc.insert_object(a, dictionary([("Next", b)]));
        doc.insert_object(b, dictionary([("Next", a)]));
        let root = doc.add_object(dictionary([("Type", Object::from(Name::from_str("Catalog"))), ("A", a.into())]));
        doc.set_root(root);

        let graph = CompressionPool::new(&doc, &params()).run().unwrap();
        assert_eq!(graph.objects.len(), 3);
        assert_eq!(graph.objects[&a], Object::from(dictionary([("Next", b)])));
        assert_eq!(graph.objects[&b], Object::from(dictionary([("Next", a)])));
        assert_eq!(graph.top_level, BTreeSet::from([root]));
        assert_eq!(graph.object_stream_objects, BTreeSet::from([a, b]));
    }

    #[test]
    fn direct_composites_are_promoted() {
        let mut doc = Document::new();
        let root = doc.add_object(dictionary([(
            "Pages",
            Object::from(dictionary([("Kids", Object::from(Vec::<Object>::new()))])),
        )]));
        doc.set_root(root);

        let graph = CompressionPool::new(&doc, &params()).run().unwrap();
        // root, the pages dictionary and the kids array
        assert_eq!(graph.objects.len(), 3);
        let pages = graph.objects[&root]
            .dictionary()
            .and_then(|d| d.get(&b"Pages"[..]))
            .and_then(Object::reference)
            .unwrap();
        assert_eq!(pages, ObjectKey::new(2, 0));
        assert!(graph.object_stream_objects.contains(&pages));
    }

    #[test]
    fn stream_dictionary_children_stay_inline() {
        let mut doc = Document::new();
        let stream = Stream::new(
            dictionary([
                ("Length", Object::Reference(ObjectKey::new(50, 0))),
                ("DecodeParms", dictionary([("Columns", 4)]).into()),
            ]),
            b"raw".to_vec(),
        );
        let stream = doc.add_object(stream);
        let root = doc.add_object(dictionary([("S", stream)]));
        doc.set_root(root);

        let params = params().with_compress_streams(false);
        let graph = CompressionPool::new(&doc, &params).run().unwrap();
        let written = graph.objects[&stream].stream().unwrap();
        assert!(written.dictionary.get(K_LENGTH).is_none());
        assert!(matches!(
            written.dictionary.get(&b"DecodeParms"[..]),
            Some(Object::Dictionary(_))
        ));
        assert!(graph.top_level.contains(&stream));
        assert_eq!(graph.objects.len(), 2);
    }

    #[test]
    fn dangling_references_become_null() {
        let mut doc = Document::new();
        let root = doc.add_object(dictionary([
            ("Gone", Object::Reference(ObjectKey::new(40, 0))),
            ("List", vec![Object::Reference(ObjectKey::new(41, 0))].into()),
        ]));
        doc.set_root(root);

        let graph = CompressionPool::new(&doc, &params()).run().unwrap();
        let root_dict = graph.objects[&root].dictionary().unwrap();
        assert!(root_dict.get(&b"Gone"[..]).is_none());
        let list = root_dict.get(&b"List"[..]).and_then(Object::reference).unwrap();
        assert_eq!(graph.objects[&list], Object::from(vec![Object::Null]));
    }

    #[test]
    fn stream_exclusivity() {
        let mut doc = Document::new();
        let content = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));
        let old = ObjectKey::new(20, 3);
        doc.insert_object(old, dictionary([("Old", true)]));
        let page = doc.add_object(dictionary([
            ("Contents", Object::from(content)),
            ("Old", old.into()),
            ("Inline", Stream::new(Dictionary::new(), b"BT ET".to_vec()).into()),
        ]));
        let encrypt = doc.add_object(dictionary([
            ("Filter", Object::from(Name::from_str("Standard"))),
            ("CF", dictionary([("StdCF", dictionary([("Length", 16)]))]).into()),
        ]));
        let root = doc.add_object(dictionary([("Page", page)]));
        doc.set_root(root);
        doc.set_encrypt(encrypt);

        let graph = CompressionPool::new(&doc, &params()).run().unwrap();
        for key in graph.object_stream_objects.iter() {
            let object = &graph.objects[key];
            assert!(!matches!(object, Object::Stream(_)));
            assert_eq!(key.generation, 0);
            assert_ne!(*key, graph.root);
            assert_ne!(Some(*key), graph.encrypt);
        }
        assert!(graph.top_level.contains(&old));
        assert!(graph.top_level.contains(&content));
        assert_eq!(graph.encrypt, Some(encrypt));
        assert!(graph.unencrypted.contains(&encrypt));
        // nested encryption dictionaries are not promoted
        assert!(matches!(
            graph.objects[&encrypt].dictionary().and_then(|d| d.get(&b"CF"[..])),
            Some(Object::Dictionary(_))
        ));

        // every object is in exactly one of the two sets
        let all: BTreeSet<_> = graph.objects.keys().copied().collect();
        assert!(graph.top_level.is_disjoint(&graph.object_stream_objects));
        let union: BTreeSet<_> = graph
            .top_level
            .union(&graph.object_stream_objects)
            .copied()
            .collect();
        assert_eq!(union, all);
    }

    #[test]
    fn stale_highest_number_does_not_collide() {
        let mut doc = Document::new();
        doc.highest_object_number = 10;
        let root_key = ObjectKey::new(3, 0);
        doc.insert_object(root_key, dictionary([("Kids", Object::from(vec![Object::Integer(1)]))]));
        doc.set_root(root_key);
        doc.highest_object_number = 10;

        let graph = CompressionPool::new(&doc, &params()).run().unwrap();
        let kids = graph.objects[&root_key]
            .dictionary()
            .and_then(|d| d.get(&b"Kids"[..]))
            .and_then(Object::reference)
            .unwrap();
        assert_eq!(kids, ObjectKey::new(11, 0));
    }

    #[test]
    fn missing_root() {
        let doc = Document::new();
        assert!(matches!(
            CompressionPool::new(&doc, &params()).run(),
            Err(CbError::MissingRoot)
        ));
    }

    #[test]
    fn streams_are_compressed_during_traversal() {
        let mut doc = Document::new();
        let data = b"0 0 m 10 10 l S ".repeat(50);
        let content = doc.add_object(Stream::new(Dictionary::new(), data.clone()));
        let root = doc.add_object(dictionary([("C", content)]));
        doc.set_root(root);

        let graph = CompressionPool::new(&doc, &params()).run().unwrap();
        let written = graph.objects[&content].stream().unwrap();
        assert!(written.data.len() < data.len());
        assert_eq!(
            written.dictionary.get(&b"Filter"[..]),
            Some(&Object::from(Name::from_str("FlateDecode")))
        );
    }

    #[test]
    fn encryption_dictionary_referenced_from_root_stays_top_level() {
        let mut doc = Document::new();
        let encrypt = doc.add_object(dictionary([
            ("Filter", Object::from(Name::from_str("Standard"))),
            ("CF", dictionary([("StdCF", dictionary([("Length", 16)]))]).into()),
        ]));
        let root = doc.add_object(dictionary([
            ("Enc", Object::from(encrypt)),
            ("Names", dictionary([("Count", 0)]).into()),
        ]));
        doc.set_root(root);
        doc.set_encrypt(encrypt);

        let graph = CompressionPool::new(&doc, &params()).run().unwrap();
        assert_eq!(graph.encrypt, Some(encrypt));
        assert!(!graph.object_stream_objects.contains(&encrypt));
        assert!(graph.top_level.contains(&encrypt));
        assert!(graph.unencrypted.contains(&encrypt));
        assert!(matches!(
            graph.objects[&encrypt].dictionary().and_then(|d| d.get(&b"CF"[..])),
            Some(Object::Dictionary(_))
        ));
        // root, the promoted names dictionary and the encryption dictionary
        assert_eq!(graph.objects.len(), 3);
        assert_eq!(graph.unencrypted, BTreeSet::from([encrypt]));
        let reference = graph.objects[&root]
            .dictionary()
            .and_then(|d| d.get(&b"Enc"[..]))
            .and_then(Object::reference);
        assert_eq!(reference, Some(encrypt));
    }

    fn gray_image(extra: Option<(&'static str, Object)>) -> Stream {
        let mut dict = dictionary([
            ("Type", Object::from(Name::from_str("XObject"))),
            ("Subtype", Name::from_str("Image").into()),
            ("Width", 64.into()),
            ("Height", 64.into()),
            ("BitsPerComponent", 8.into()),
            ("ColorSpace", Name::from_str("DeviceGray").into()),
        ]);
        if let Some((k, v)) = extra {
            dict.insert(Name::from_str(k), v);
        }
        let data = (0..64 * 64).map(|i| ((i % 64) * 4) as u8).collect();
        Stream::new(dict, data)
    }

    #[test]
    fn image_compression_keeps_masked_images() {
        let mut doc = Document::new();
        let mask = doc.add_object(gray_image(None));
        let masked = gray_image(Some(("SMask", mask.into())));
        let masked_data = masked.data.clone();
        let masked = doc.add_object(masked);
        let plain = doc.add_object(gray_image(None));
        let root = doc.add_object(dictionary([("Masked", masked), ("Plain", plain)]));
        doc.set_root(root);

        let params = params()
            .with_compress_streams(false)
            .with_compress_images(true)
            .with_image_quality(50);
        let graph = CompressionPool::new(&doc, &params).run().unwrap();

        let written = graph.objects[&masked].stream().unwrap();
        assert_eq!(written.data, masked_data);
        assert!(written.dictionary.get(&b"Filter"[..]).is_none());
        assert_eq!(written.dictionary.get(&b"SMask"[..]), Some(&Object::Reference(mask)));

        let written = graph.objects[&plain].stream().unwrap();
        assert_eq!(
            written.dictionary.get(&b"Filter"[..]),
            Some(&Object::from(Name::from_str("DCTDecode")))
        );
        assert_eq!(&written.data[..2], &[0xFF, 0xD8]);
    }
}
