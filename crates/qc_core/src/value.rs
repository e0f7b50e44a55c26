//! The tagged runtime value.

use std::fmt;
use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

use crate::block::ByteBlock;
use crate::errcode::ErrorCode;
use crate::number::{Complex, Number};
use crate::subtype::Subtype;
use crate::text::Text;
use crate::FastIndexMap;

pub const MAX_DIM: usize = 4;

/// Handle of a block owned by the named-block registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamedBlockId(pub u32);

/// Handle of an entry in the file table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    pub const STDIN: FileId = FileId(0);
    pub const STDOUT: FileId = FileId(1);
    pub const STDERR: FileId = FileId(2);

    pub fn is_std(self) -> bool {
        self.0 <= 2
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fieldless discriminant of [`Data`], used for dispatch and type names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Number,
    Complex,
    Text,
    Block,
    NamedBlock,
    Octet,
    Matrix,
    List,
    Assoc,
    File,
    Error,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Number => "number",
            Kind::Complex => "complex",
            Kind::Text => "string",
            Kind::Block => "block",
            Kind::NamedBlock => "nblock",
            Kind::Octet => "octet",
            Kind::Matrix => "matrix",
            Kind::List => "list",
            Kind::Assoc => "association",
            Kind::File => "file",
            Kind::Error => "error",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What an octet points into.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OctetTarget {
    Text(Text),
    NamedBlock(NamedBlockId),
}

/// One byte inside a text or named block.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Octet {
    pub target: OctetTarget,
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Matrix {
    bounds: SmallVec<[(i64, i64); MAX_DIM]>,
    table: Vec<Value>,
}

impl Matrix {
    /// Creates a matrix with inclusive `(min, max)` bounds per dimension,
    /// filled with zero. Returns `None` past four dimensions or for
    /// inverted bounds; every dimension holds at least one index, so the
    /// empty matrix only comes from [`Matrix::from_values`].
    pub fn new(bounds: &[(i64, i64)]) -> Option<Self> {
        if bounds.len() > MAX_DIM || bounds.iter().any(|&(lo, hi)| hi < lo) {
            return None;
        }
        let size = bounds
            .iter()
            .try_fold(1usize, |acc, &(lo, hi)| acc.checked_mul(usize::try_from(hi - lo + 1).ok()?))?;
        let zero = Value::number(Number::zero());
        Some(Self { bounds: SmallVec::from_slice(bounds), table: vec![zero; size] })
    }

    /// One-dimensional matrix indexed from zero. No values give the empty
    /// matrix, whose single dimension has bounds `(0, -1)` and holds no
    /// index.
    pub fn from_values(values: Vec<Value>) -> Self {
        let hi = values.len() as i64 - 1;
        let mut bounds = SmallVec::new();
        bounds.push((0, hi));
        Self { bounds, table: values }
    }

    pub fn dims(&self) -> usize {
        self.bounds.len()
    }

    pub fn bounds(&self) -> &[(i64, i64)] {
        &self.bounds
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn elements(&self) -> &[Value] {
        &self.table
    }

    pub fn elements_mut(&mut self) -> &mut [Value] {
        &mut self.table
    }

    /// Row-major offset of `index`, or `None` when out of bounds.
    pub fn offset(&self, index: &[i64]) -> Option<usize> {
        if index.len() != self.bounds.len() {
            return None;
        }
        let mut offset = 0usize;
        for (&i, &(lo, hi)) in index.iter().zip(self.bounds.iter()) {
            if i < lo || i > hi {
                return None;
            }
            offset = offset * (hi - lo + 1) as usize + (i - lo) as usize;
        }
        Some(offset)
    }

    pub fn get(&self, index: &[i64]) -> Option<&Value> {
        self.offset(index).map(|at| &self.table[at])
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct List {
    items: Vec<Value>,
}

impl List {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(items: Vec<Value>) -> Self {
        Self { items }
    }

    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [Value] {
        &mut self.items
    }
}

/// Insertion-ordered map from index tuples to values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assoc {
    map: FastIndexMap<Vec<Value>, Value>,
}

impl Assoc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: Vec<Value>, value: Value) -> Option<Value> {
        self.map.insert(key, value)
    }

    pub fn get(&self, key: &[Value]) -> Option<&Value> {
        self.map.get(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[Value], &Value)> {
        self.map.iter().map(|(k, v)| (k.as_slice(), v))
    }
}

impl Hash for Assoc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Equality ignores order, so only the size is hashed.
        self.map.len().hash(state);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Data {
    Null,
    Number(Number),
    Complex(Complex),
    Text(Text),
    Block(ByteBlock),
    NamedBlock(NamedBlockId),
    Octet(Octet),
    Matrix(Box<Matrix>),
    List(Box<List>),
    Assoc(Box<Assoc>),
    File(FileId),
    Error(ErrorCode),
}

/// A value and its protection bits. Equality and hashing look at the data
/// only.
#[derive(Clone, Debug)]
pub struct Value {
    pub data: Data,
    pub subtype: Subtype,
}

impl Value {
    pub const NULL: Value = Value { data: Data::Null, subtype: Subtype::empty() };

    pub fn new(data: Data) -> Self {
        Self { data, subtype: Subtype::empty() }
    }

    pub fn number(n: Number) -> Self {
        Self::new(Data::Number(n))
    }

    pub fn int(n: i64) -> Self {
        Self::number(Number::from_i64(n))
    }

    pub fn text(t: Text) -> Self {
        Self::new(Data::Text(t))
    }

    pub fn str(s: &str) -> Self {
        Self::text(Text::from(s))
    }

    pub fn block(b: ByteBlock) -> Self {
        Self::new(Data::Block(b))
    }

    pub fn named_block(id: NamedBlockId) -> Self {
        Self::new(Data::NamedBlock(id))
    }

    pub fn octet(target: OctetTarget, index: usize) -> Self {
        Self::new(Data::Octet(Octet { target, index }))
    }

    pub fn matrix(m: Matrix) -> Self {
        Self::new(Data::Matrix(Box::new(m)))
    }

    pub fn list(l: List) -> Self {
        Self::new(Data::List(Box::new(l)))
    }

    pub fn assoc(a: Assoc) -> Self {
        Self::new(Data::Assoc(Box::new(a)))
    }

    pub fn file(id: FileId) -> Self {
        Self::new(Data::File(id))
    }

    pub fn error(code: ErrorCode) -> Self {
        Self::new(Data::Error(code))
    }

    pub fn with_subtype(mut self, bits: Subtype) -> Self {
        self.subtype = bits;
        self
    }

    pub fn protect(&mut self, bits: Subtype) {
        self.subtype.insert(bits);
    }

    pub fn unprotect(&mut self, bits: Subtype) {
        self.subtype.remove(bits);
    }

    pub fn kind(&self) -> Kind {
        match &self.data {
            Data::Null => Kind::Null,
            Data::Number(_) => Kind::Number,
            Data::Complex(_) => Kind::Complex,
            Data::Text(_) => Kind::Text,
            Data::Block(_) => Kind::Block,
            Data::NamedBlock(_) => Kind::NamedBlock,
            Data::Octet(_) => Kind::Octet,
            Data::Matrix(_) => Kind::Matrix,
            Data::List(_) => Kind::List,
            Data::Assoc(_) => Kind::Assoc,
            Data::File(_) => Kind::File,
            Data::Error(_) => Kind::Error,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn is_null(&self) -> bool {
        matches!(self.data, Data::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.data, Data::Error(_))
    }

    pub fn as_number(&self) -> Option<&Number> {
        match &self.data {
            Data::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Integer value, if this is an integer that fits `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(Number::to_i64)
    }

    pub fn as_text(&self) -> Option<&Text> {
        match &self.data {
            Data::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&ByteBlock> {
        match &self.data {
            Data::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_block_mut(&mut self) -> Option<&mut ByteBlock> {
        match &mut self.data {
            Data::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_named_block(&self) -> Option<NamedBlockId> {
        match self.data {
            Data::NamedBlock(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&Matrix> {
        match &self.data {
            Data::Matrix(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match &self.data {
            Data::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<FileId> {
        match self.data {
            Data::File(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<ErrorCode> {
        match self.data {
            Data::Error(code) => Some(code),
            _ => None,
        }
    }

    /// The single byte this value contributes when stored into a block.
    pub fn to_octet(&self) -> u8 {
        match &self.data {
            Data::Number(n) => n.low_octet(),
            Data::Complex(c) => c.re.low_octet(),
            Data::Text(t) => t.as_bytes().first().copied().unwrap_or(0),
            Data::Block(b) => b.as_slice().first().copied().unwrap_or(0),
            Data::Octet(Octet { target: OctetTarget::Text(t), index }) => {
                t.as_bytes().get(*index).copied().unwrap_or(0)
            }
            _ => 0,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::NULL
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.hash(state);
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::number(n)
    }
}

impl From<Text> for Value {
    fn from(t: Text) -> Self {
        Value::text(t)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            Data::Null => Ok(()),
            Data::Number(n) => write!(f, "{n}"),
            Data::Complex(c) => write!(f, "{c}"),
            Data::Text(t) => write!(f, "\"{t}\""),
            Data::Block(b) => write!(f, "block: {b}"),
            Data::NamedBlock(id) => write!(f, "nblock {}", id.0),
            Data::Octet(o) => write!(f, "octet [{}]", o.index),
            Data::Matrix(m) => write!(f, "mat [{}]", m.len()),
            Data::List(l) => write!(f, "list ({} elements)", l.len()),
            Data::Assoc(a) => write!(f, "assoc ({} elements)", a.len()),
            Data::File(id) => write!(f, "FILE {id}"),
            Data::Error(code) => write!(f, "{code}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_matrix_has_no_index() {
        let m = Matrix::from_values(Vec::new());
        assert!(m.is_empty());
        assert_eq!(m.bounds(), &[(0, -1)]);
        assert_eq!(m.offset(&[0]), None);
        assert_eq!(m.offset(&[-1]), None);
        assert!(Matrix::new(&[(0, -1)]).is_none());
    }

    #[test]
    fn equality_ignores_subtype() {
        let a = Value::int(3);
        let b = Value::int(3).with_subtype(Subtype::NO_COPY_TO);
        assert_eq!(a, b);
        assert_ne!(a, Value::str("3"));
    }

    #[test]
    fn clone_links_shared_payloads() {
        let v = Value::str("shared");
        let w = v.clone();
        assert_eq!(v.as_text().unwrap().links(), 2);
        drop(w);
        assert_eq!(v.as_text().unwrap().links(), 1);
    }

    #[test]
    fn matrix_offsets_are_row_major() {
        let m = Matrix::new(&[(1, 2), (0, 2)]).unwrap();
        assert_eq!(m.len(), 6);
        assert_eq!(m.offset(&[1, 0]), Some(0));
        assert_eq!(m.offset(&[2, 1]), Some(4));
        assert_eq!(m.offset(&[3, 0]), None);
        assert!(Matrix::new(&[(0, 1); 5]).is_none());
    }

    #[test]
    fn octet_of_each_kind() {
        assert_eq!(Value::int(0x141).to_octet(), 0x41);
        assert_eq!(Value::str("Hi").to_octet(), b'H');
        assert_eq!(Value::str("").to_octet(), 0);
        assert_eq!(Value::NULL.to_octet(), 0);
    }

    #[test]
    fn assoc_lookup_by_slice() {
        let mut a = Assoc::new();
        a.insert(vec![Value::int(1), Value::str("x")], Value::int(9));
        assert_eq!(a.get(&[Value::int(1), Value::str("x")]), Some(&Value::int(9)));
        assert_eq!(a.get(&[Value::int(1)]), None);
    }

    #[test]
    fn kind_names() {
        assert_eq!(Value::file(FileId::STDOUT).type_name(), "file");
        assert_eq!(Value::block(ByteBlock::default()).kind(), Kind::Block);
    }
}
