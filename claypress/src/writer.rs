//! Byte sinks and the file-level state machine that drives one write.

use std::{collections::BTreeSet, collections::VecDeque, io};

use fnv::FnvHashMap;
use sha2::{Digest, Sha256};

use crate::{
    compress::{object_stream, CompressedGraph, CompressionPool, TableResolver},
    error::{CbError, Result},
    options::{CompressParameters, SaveOptions},
    pdf::{
        trailer::Trailer,
        xref::{UsedCompressedObject, UsedObject, Xref, XrefEntry},
        Bytes, Document, Object, ObjectKey,
    },
    pool::{NodeKey, ObjectPool},
    security::SecurityHandler,
    simple_encode::{
        object::{ObjectEncoder, ReferenceResolver},
        section,
    },
};

/// Header comment announcing binary content.
const BINARY_MARKER: &[u8] = b"%\xF6\xE4\xFC\xDF\n";

/// Object streams need at least this version.
const OBJECT_STREAM_VERSION: (u8, u8) = (1, 5);

pub trait Writer {
    fn write(&mut self, buf: &[u8]);
}

impl Writer for Vec<u8> {
    fn write(&mut self, buf: &[u8]) {
        self.extend(buf);
    }
}

pub trait Encoder<T> {
    fn write_to(obj: &T, writer: &mut dyn Writer);
}

/// Forwards bytes to the sink while counting them and hashing them for the
/// file identifier.
pub struct PositionWriter<W: io::Write> {
    inner: W,
    position: usize,
    digest: Sha256,
}

impl<W: io::Write> PositionWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            position: 0,
            digest: Sha256::new(),
        }
    }

    pub fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.write_all(buf)?;
        self.digest.update(buf);
        self.position += buf.len();
        Ok(())
    }

    /// Number of bytes written so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Identifier derived from everything written so far.
    pub fn content_id(&self) -> Bytes {
        let hash = self.digest.clone().finalize();
        hash[..16].to_vec().into()
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    Body,
    EncryptBody,
    Xref,
    Trailer,
    Eof,
}

/// Writes one document into one sink.
///
/// The sink is owned by the writer and handed back by [`PdfWriter::write`]
/// after it was flushed. On error the sink is dropped.
pub struct PdfWriter<W: io::Write> {
    out: PositionWriter<W>,
    options: SaveOptions,
    security: Option<Box<dyn SecurityHandler>>,
    phase: Phase,
    entries: Vec<XrefEntry>,
}

impl<W: io::Write> PdfWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            out: PositionWriter::new(sink),
            options: SaveOptions::default(),
            security: None,
            phase: Phase::Header,
            entries: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: SaveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_security_handler(mut self, handler: Box<dyn SecurityHandler>) -> Self {
        self.security = Some(handler);
        self
    }

    /// Write `document` and return the flushed sink.
    pub fn write(mut self, document: &Document) -> Result<W> {
        let encrypting = document.encrypt.as_ref().map_or(false, |e| !e.is_null());
        if encrypting {
            self.security
                .as_mut()
                .ok_or(CbError::MissingSecurityHandler)?
                .prepare_for_encryption(document)?;
        } else {
            self.security = None;
        }

        match self.options.compression.clone() {
            None => self.write_classic(document)?,
            Some(params) => self.write_compressed(document, &params)?,
        }

        self.enter(Phase::Eof);
        Ok(self.out.finish()?)
    }

    fn enter(&mut self, phase: Phase) {
        log::trace!("{:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn write_header(&mut self, version: (u8, u8)) -> Result<()> {
        self.enter(Phase::Header);
        self.out
            .write_all(format!("%PDF-{}.{}\n", version.0, version.1).as_bytes())?;
        self.out.write_all(BINARY_MARKER)?;
        Ok(())
    }

    /// Encode `object` as `n g obj ... endobj` and record its offset.
    fn write_indirect(
        &mut self,
        key: ObjectKey,
        object: &Object,
        resolver: &mut dyn ReferenceResolver,
        encrypt: bool,
    ) -> Result<()> {
        let mut buf = Vec::new();
        let mut encoder = ObjectEncoder::new(resolver);
        if encrypt {
            if let Some(handler) = self.security.as_deref() {
                encoder = encoder.with_encryption(handler);
            }
        }
        encoder.encode_indirect(key, object, &mut buf)?;

        self.entries.push(
            UsedObject {
                number: key.number,
                byte_offset: self.out.position(),
                generation: key.generation,
            }
            .into(),
        );
        self.out.write_all(&buf)?;
        Ok(())
    }

    /// Classic layout: objects are discovered while they are written and the
    /// file ends with a cross-reference table.
    fn write_classic(&mut self, document: &Document) -> Result<()> {
        self.write_header(document.version)?;

        let mut resolver = LazyResolver::new(document);
        let root = resolver.claim(&document.root, true)?.ok_or(CbError::MissingRoot)?;
        let info = match &document.info {
            Some(info) => resolver.claim(info, true)?,
            None => None,
        };
        // claimed now so references resolve to it, written last
        let encrypt = match &document.encrypt {
            Some(encrypt) => resolver.claim(encrypt, false)?,
            None => None,
        };

        self.enter(Phase::Body);
        self.drain(&mut resolver, true)?;

        if let Some(key) = encrypt {
            self.enter(Phase::EncryptBody);
            resolver.enqueue(key);
            self.drain(&mut resolver, false)?;
        }

        self.enter(Phase::Xref);
        let start_xref = self.out.position();
        let id = document
            .id
            .clone()
            .unwrap_or_else(|| [self.out.content_id(), self.out.content_id()]);
        let xref = Xref::from_entries(std::mem::take(&mut self.entries))?;
        let mut buf = Vec::new();
        section::write_xref_table(&xref, &mut buf);

        self.enter(Phase::Trailer);
        let trailer = Trailer {
            size: xref.size(),
            root,
            encrypt,
            info,
            id,
        };
        section::write_trailer(&trailer, &mut buf)?;
        section::write_startxref(start_xref, &mut buf);
        self.out.write_all(&buf)?;
        Ok(())
    }

    fn drain(&mut self, resolver: &mut LazyResolver<'_>, encrypt: bool) -> Result<()> {
        while let Some((key, object)) = resolver.next_object() {
            self.write_indirect(key, &object, resolver, encrypt)?;
        }
        Ok(())
    }

    /// Compressed layout: traversal, object streams and a cross-reference
    /// stream.
    fn write_compressed(&mut self, document: &Document, params: &CompressParameters) -> Result<()> {
        self.write_header(document.version.max(OBJECT_STREAM_VERSION))?;

        let CompressedGraph {
            objects,
            top_level,
            object_stream_objects,
            unencrypted,
            root,
            info,
            encrypt,
            mut pool,
        } = CompressionPool::new(document, params).run()?;

        let containers = object_stream::pack(
            &objects,
            &object_stream_objects,
            params.object_stream_size(),
            &mut pool,
        )?;
        let xref_key = {
            let node = pool.anonymous();
            pool.allocate(None, node)?
        };

        let mut resolver = TableResolver::new(&pool);

        self.enter(Phase::Body);
        let (encrypted, deferred): (BTreeSet<ObjectKey>, BTreeSet<ObjectKey>) =
            top_level.iter().partition(|key| !unencrypted.contains(*key));
        for key in encrypted {
            let object = objects.get(&key).ok_or(CbError::UnresolvedReference(key))?;
            self.write_indirect(key, object, &mut resolver, true)?;
        }
        for container in containers {
            let object = Object::Stream(container.stream);
            self.write_indirect(container.key, &object, &mut resolver, true)?;
            for (index, member) in container.members.iter().enumerate() {
                self.entries.push(
                    UsedCompressedObject {
                        number: member.key.number,
                        containing_object: container.key.number,
                        // `index` is bounded by the object stream size
                        index: index as u32,
                    }
                    .into(),
                );
            }
        }

        self.enter(Phase::EncryptBody);
        for key in deferred {
            let object = objects.get(&key).ok_or(CbError::UnresolvedReference(key))?;
            self.write_indirect(key, object, &mut resolver, false)?;
        }

        self.enter(Phase::Xref);
        let start_xref = self.out.position();
        self.entries.push(
            UsedObject {
                number: xref_key.number,
                byte_offset: start_xref,
                generation: xref_key.generation,
            }
            .into(),
        );
        let id = document
            .id
            .clone()
            .unwrap_or_else(|| [self.out.content_id(), self.out.content_id()]);
        let xref = Xref::from_entries(std::mem::take(&mut self.entries))?;

        self.enter(Phase::Trailer);
        let trailer = Trailer {
            size: xref.size(),
            root,
            encrypt,
            info,
            id,
        };
        let stream = section::xref_stream(&xref, trailer)?;
        let mut buf = Vec::new();
        ObjectEncoder::new(&mut resolver).encode_indirect(xref_key, &Object::Stream(stream), &mut buf)?;
        section::write_startxref(start_xref, &mut buf);
        self.out.write_all(&buf)?;
        Ok(())
    }
}

/// Resolves references of the document while it is written in the classic
/// layout. Every newly seen target gets an identity and is queued.
struct LazyResolver<'d> {
    document: &'d Document,
    pool: ObjectPool,
    queue: VecDeque<(ObjectKey, NodeKey)>,
    anonymous: FnvHashMap<NodeKey, Object>,
}

impl<'d> LazyResolver<'d> {
    fn new(document: &'d Document) -> Self {
        Self {
            document,
            pool: ObjectPool::new(document.highest_object_number),
            queue: VecDeque::new(),
            anonymous: FnvHashMap::default(),
        }
    }

    /// Give a trailer entry an identity. Direct objects become anonymous
    /// indirect objects.
    fn claim(&mut self, object: &Object, queue: bool) -> Result<Option<ObjectKey>> {
        let key = match object {
            Object::Null => None,
            Object::Reference(r) => self.claim_reference(*r, queue)?,
            direct => {
                let node = self.pool.anonymous();
                let key = self.pool.allocate(None, node)?;
                self.anonymous.insert(node, direct.clone());
                if queue {
                    self.queue.push_back((key, node));
                }
                Some(key)
            }
        };
        Ok(key)
    }

    fn claim_reference(&mut self, reference: ObjectKey, queue: bool) -> Result<Option<ObjectKey>> {
        let Some(node) = NodeKey::of_reference(self.document, reference) else {
            log::warn!("Dangling reference {}", reference);
            return Ok(None);
        };
        if let Some(key) = self.pool.lookup_key(node) {
            return Ok(Some(key));
        }
        let requested = match node {
            NodeKey::Source(target) => Some(target),
            NodeKey::Anonymous(_) => None,
        };
        let key = self.pool.allocate(requested, node)?;
        log::debug!("{} is written as {}", reference, key);
        if queue {
            self.queue.push_back((key, node));
        }
        Ok(Some(key))
    }

    fn enqueue(&mut self, key: ObjectKey) {
        if let Some(node) = self.pool.lookup_node(key) {
            self.queue.push_back((key, node));
        }
    }

    fn next_object(&mut self) -> Option<(ObjectKey, Object)> {
        let (key, node) = self.queue.pop_front()?;
        let object = match node {
            NodeKey::Source(source) => self
                .document
                .dereference(source)
                .map(|(_, o)| o.clone())
                .unwrap_or_default(),
            NodeKey::Anonymous(_) => self.anonymous.remove(&node).unwrap_or_default(),
        };
        Some((key, object))
    }
}

impl ReferenceResolver for LazyResolver<'_> {
    fn resolve(&mut self, reference: ObjectKey) -> Result<Option<ObjectKey>> {
        self.claim_reference(reference, true)
    }

    fn promote(&mut self, object: &Object) -> Result<ObjectKey> {
        self.claim(object, true)?.ok_or(CbError::DirectStream)
    }
}
