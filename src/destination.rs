//! Destination handles: where scanned records go.
//!
//! A [`Destination`] is one of three shapes. `select_one` fills a single
//! record in place; `select_all` appends to a sequence or stores into a keyed
//! collection. The inspector checks a destination against the operation and
//! the record type before any query runs.

use crate::error::{Error, Result};
use crate::record::{ColumnMatch, Record, RecordDescriptor};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

/// Structural category of a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Single,
    Sequence,
    Mapping,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Single => "single record",
            Self::Sequence => "record sequence",
            Self::Mapping => "record mapping",
        };
        f.write_str(name)
    }
}

/// A keyed collection records can be stored into. Inserting at an existing
/// key replaces the previous record.
pub trait KeyedCollection<K, T>: Send {
    fn insert_record(&mut self, key: K, record: T);
}

impl<K, T, S> KeyedCollection<K, T> for HashMap<K, T, S>
where
    K: Eq + Hash + Send,
    T: Send,
    S: BuildHasher + Send,
{
    fn insert_record(&mut self, key: K, record: T) {
        self.insert(key, record);
    }
}

impl<K, T> KeyedCollection<K, T> for BTreeMap<K, T>
where
    K: Ord + Send,
    T: Send,
{
    fn insert_record(&mut self, key: K, record: T) {
        self.insert(key, record);
    }
}

/// Type-erased mapping destination: a collection plus its key function.
pub trait RecordSink<T>: Send {
    fn store(&mut self, record: T);
}

struct KeyedSink<'a, K, C, F> {
    collection: &'a mut C,
    key: F,
    _key: PhantomData<fn() -> K>,
}

impl<K, T, C, F> RecordSink<T> for KeyedSink<'_, K, C, F>
where
    C: KeyedCollection<K, T>,
    F: Fn(&T) -> K + Send,
{
    fn store(&mut self, record: T) {
        let key = (self.key)(&record);
        self.collection.insert_record(key, record);
    }
}

/// Where the records of one call are delivered.
pub enum Destination<'a, T> {
    /// One record, overwritten in place from the first row.
    Single(&'a mut T),
    /// Records appended in cursor order; existing entries are kept.
    Sequence(&'a mut Vec<T>),
    /// Records stored at a key derived from each record; later rows win.
    Mapping(Box<dyn RecordSink<T> + 'a>),
}

impl<'a, T: Record> Destination<'a, T> {
    pub fn single(record: &'a mut T) -> Self {
        Self::Single(record)
    }

    pub fn sequence(records: &'a mut Vec<T>) -> Self {
        Self::Sequence(records)
    }

    /// A keyed destination; `key` derives each record's key, usually from its
    /// primary key field.
    pub fn mapping<K, C, F>(collection: &'a mut C, key: F) -> Self
    where
        K: 'a,
        C: KeyedCollection<K, T> + 'a,
        F: Fn(&T) -> K + Send + 'a,
        T: 'a,
    {
        Self::Mapping(Box::new(KeyedSink {
            collection,
            key,
            _key: PhantomData,
        }))
    }
}

impl<T> Destination<'_, T> {
    pub fn shape(&self) -> Shape {
        match self {
            Self::Single(_) => Shape::Single,
            Self::Sequence(_) => Shape::Sequence,
            Self::Mapping(_) => Shape::Mapping,
        }
    }

    pub(crate) fn single_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Single(record) => Some(&mut **record),
            _ => None,
        }
    }

    /// Moves a finished record into the destination.
    pub(crate) fn store(&mut self, record: T) {
        match self {
            Self::Single(slot) => **slot = record,
            Self::Sequence(records) => records.push(record),
            Self::Mapping(sink) => sink.store(record),
        }
    }
}

impl<T> fmt::Debug for Destination<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Destination").field(&self.shape()).finish()
    }
}

/// A validated destination: its shape and the record descriptor to bind with.
pub struct Inspection<T> {
    pub shape: Shape,
    pub descriptor: RecordDescriptor<T>,
}

/// Checks that `destination` has one of the `accepted` shapes and that its
/// record type describes a usable aggregate.
///
/// Fails with [`Error::Shape`], which correct callers never see.
pub fn inspect<T: Record>(
    destination: &Destination<'_, T>,
    operation: &str,
    accepted: &[Shape],
    matcher: ColumnMatch,
) -> Result<Inspection<T>> {
    let shape = destination.shape();
    if !accepted.contains(&shape) {
        let expected: Vec<String> = accepted.iter().map(Shape::to_string).collect();
        return Err(Error::shape(format!(
            "{operation} needs a {} destination, got a {shape}",
            expected.join(" or ")
        )));
    }

    let descriptor = RecordDescriptor::<T>::of();
    descriptor.validate(matcher)?;

    Ok(Inspection { shape, descriptor })
}
