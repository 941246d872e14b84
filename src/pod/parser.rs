//! Structural cursor over an existing POD tree.
//!
//! A [`Pod`] is a bounds-checked view of one value inside a borrowed byte
//! buffer: scalar reads copy, string/bytes reads borrow from the buffer.
//! [`PodParser`] walks a tree sequentially the way message demarshalers
//! consume it; the typed container views ([`ObjectPod`], [`ArrayPod`],
//! [`ChoicePod`], [`SequencePod`]) serve random access.
//!
//! Every advance validates that at least a header is available and that the
//! declared body fits inside the parent before anything is read; violations
//! surface as `Malformed` with the absolute byte offset.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::decode::PodDecodeError;

use super::types::{
    align8, ChoiceType, Fraction, PodType, Rectangle, MAX_NESTING_DEPTH, POD_HEADER_SIZE,
};

/// View of a single POD positioned at its header.
#[derive(Debug, Clone, Copy)]
pub struct Pod<'a> {
    ty: PodType,
    body: &'a [u8],
    /// Absolute offset of the header in the original buffer, for diagnostics.
    offset: usize,
}

/// Parses the pod starting at `pos` inside `data`; `base` is the absolute
/// offset of `data[0]` for error reporting.
pub(crate) fn parse_in<'a>(
    data: &'a [u8],
    pos: usize,
    base: usize,
) -> Result<Pod<'a>, PodDecodeError> {
    let offset = base + pos;
    if data.len() < pos + POD_HEADER_SIZE {
        return Err(PodDecodeError::Malformed {
            offset,
            reason: "truncated header".into(),
        });
    }
    let size = LittleEndian::read_u32(&data[pos..pos + 4]) as usize;
    let raw_ty = LittleEndian::read_u32(&data[pos + 4..pos + 8]);
    let ty = PodType::from_wire(raw_ty).ok_or_else(|| PodDecodeError::Malformed {
        offset,
        reason: format!("unknown type tag {raw_ty}"),
    })?;
    if data.len() < pos + POD_HEADER_SIZE + size {
        return Err(PodDecodeError::Malformed {
            offset,
            reason: format!("body of {size} bytes overruns the buffer"),
        });
    }
    Ok(Pod {
        ty,
        body: &data[pos + POD_HEADER_SIZE..pos + POD_HEADER_SIZE + size],
        offset,
    })
}

impl<'a> Pod<'a> {
    /// Wraps a byte slice positioned at a POD header.
    pub fn from_bytes(data: &'a [u8]) -> Result<Self, PodDecodeError> {
        parse_in(data, 0, 0)
    }

    pub fn type_(&self) -> PodType {
        self.ty
    }

    pub fn size(&self) -> usize {
        self.body.len()
    }

    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Total on-wire footprint: header plus padded body.
    pub fn footprint(&self) -> usize {
        POD_HEADER_SIZE + align8(self.body.len())
    }

    /// Fresh standalone copy of the subtree, re-parsable on its own.
    pub fn to_owned(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.footprint()];
        LittleEndian::write_u32(&mut out[..4], self.body.len() as u32);
        LittleEndian::write_u32(&mut out[4..8], self.ty as u32);
        out[POD_HEADER_SIZE..POD_HEADER_SIZE + self.body.len()].copy_from_slice(self.body);
        out
    }

    fn expect(&self, expected: PodType) -> Result<(), PodDecodeError> {
        if self.ty != expected {
            return Err(PodDecodeError::TypeMismatch {
                expected,
                found: self.ty,
            });
        }
        Ok(())
    }

    fn fixed_body(&self, expected: PodType, n: usize) -> Result<&'a [u8], PodDecodeError> {
        self.expect(expected)?;
        if self.body.len() < n {
            return Err(PodDecodeError::Malformed {
                offset: self.offset,
                reason: format!("{expected} body is {} bytes, need {n}", self.body.len()),
            });
        }
        Ok(&self.body[..n])
    }

    // --- Scalars ---

    pub fn is_none(&self) -> bool {
        self.ty == PodType::None
    }

    pub fn as_bool(&self) -> Result<bool, PodDecodeError> {
        let b = self.fixed_body(PodType::Bool, 4)?;
        Ok(LittleEndian::read_u32(b) != 0)
    }

    pub fn as_id(&self) -> Result<u32, PodDecodeError> {
        let b = self.fixed_body(PodType::Id, 4)?;
        Ok(LittleEndian::read_u32(b))
    }

    pub fn as_int(&self) -> Result<i32, PodDecodeError> {
        let b = self.fixed_body(PodType::Int, 4)?;
        Ok(LittleEndian::read_i32(b))
    }

    pub fn as_long(&self) -> Result<i64, PodDecodeError> {
        let b = self.fixed_body(PodType::Long, 8)?;
        Ok(LittleEndian::read_i64(b))
    }

    pub fn as_float(&self) -> Result<f32, PodDecodeError> {
        let b = self.fixed_body(PodType::Float, 4)?;
        Ok(LittleEndian::read_f32(b))
    }

    pub fn as_double(&self) -> Result<f64, PodDecodeError> {
        let b = self.fixed_body(PodType::Double, 8)?;
        Ok(LittleEndian::read_f64(b))
    }

    /// Borrows the string body without the mandatory NUL terminator.
    pub fn as_str(&self) -> Result<&'a str, PodDecodeError> {
        self.expect(PodType::String)?;
        match self.body.split_last() {
            Some((&0, text)) => {
                std::str::from_utf8(text).map_err(|_| PodDecodeError::Malformed {
                    offset: self.offset,
                    reason: "invalid UTF-8 in string body".into(),
                })
            }
            Some(_) => Err(PodDecodeError::Malformed {
                offset: self.offset,
                reason: "string body is not NUL-terminated".into(),
            }),
            None => Err(PodDecodeError::Malformed {
                offset: self.offset,
                reason: "empty string body".into(),
            }),
        }
    }

    pub fn as_bytes(&self) -> Result<&'a [u8], PodDecodeError> {
        self.expect(PodType::Bytes)?;
        Ok(self.body)
    }

    pub fn as_rectangle(&self) -> Result<Rectangle, PodDecodeError> {
        let b = self.fixed_body(PodType::Rectangle, 8)?;
        Ok(Rectangle {
            width: LittleEndian::read_u32(&b[..4]),
            height: LittleEndian::read_u32(&b[4..]),
        })
    }

    pub fn as_fraction(&self) -> Result<Fraction, PodDecodeError> {
        let b = self.fixed_body(PodType::Fraction, 8)?;
        Ok(Fraction {
            num: LittleEndian::read_u32(&b[..4]),
            denom: LittleEndian::read_u32(&b[4..]),
        })
    }

    /// `(pointer type, opaque value)`; never dereferenced here.
    pub fn as_pointer(&self) -> Result<(u32, u64), PodDecodeError> {
        let b = self.fixed_body(PodType::Pointer, 16)?;
        Ok((
            LittleEndian::read_u32(&b[..4]),
            LittleEndian::read_u64(&b[8..]),
        ))
    }

    pub fn as_fd(&self) -> Result<i64, PodDecodeError> {
        let b = self.fixed_body(PodType::Fd, 8)?;
        Ok(LittleEndian::read_i64(b))
    }

    // --- Containers ---

    pub fn as_struct(&self) -> Result<PodIter<'a>, PodDecodeError> {
        self.expect(PodType::Struct)?;
        Ok(PodIter::new(self.body, self.offset + POD_HEADER_SIZE))
    }

    pub fn as_object(&self) -> Result<ObjectPod<'a>, PodDecodeError> {
        self.expect(PodType::Object)?;
        if self.body.len() < 8 {
            return Err(PodDecodeError::Malformed {
                offset: self.offset,
                reason: "object body too short".into(),
            });
        }
        Ok(ObjectPod {
            object_type: LittleEndian::read_u32(&self.body[..4]),
            object_id: LittleEndian::read_u32(&self.body[4..8]),
            body: &self.body[8..],
            base: self.offset + POD_HEADER_SIZE + 8,
            offset: self.offset,
        })
    }

    pub fn as_array(&self) -> Result<ArrayPod<'a>, PodDecodeError> {
        self.expect(PodType::Array)?;
        if self.body.len() < 8 {
            return Err(PodDecodeError::Malformed {
                offset: self.offset,
                reason: "array body too short".into(),
            });
        }
        let child_size = LittleEndian::read_u32(&self.body[..4]);
        let raw_child = LittleEndian::read_u32(&self.body[4..8]);
        let child_type = PodType::from_wire(raw_child).ok_or_else(|| PodDecodeError::Malformed {
            offset: self.offset,
            reason: format!("unknown array child tag {raw_child}"),
        })?;
        let elems = &self.body[8..];
        check_elements(elems.len(), child_size, self.offset)?;
        Ok(ArrayPod {
            child_type,
            child_size,
            elems,
            offset: self.offset,
        })
    }

    pub fn as_choice(&self) -> Result<ChoicePod<'a>, PodDecodeError> {
        self.expect(PodType::Choice)?;
        if self.body.len() < 16 {
            return Err(PodDecodeError::Malformed {
                offset: self.offset,
                reason: "choice body too short".into(),
            });
        }
        let raw_choice = LittleEndian::read_u32(&self.body[..4]);
        let choice_type =
            ChoiceType::from_wire(raw_choice).ok_or_else(|| PodDecodeError::Malformed {
                offset: self.offset,
                reason: format!("unknown choice type {raw_choice}"),
            })?;
        let flags = LittleEndian::read_u32(&self.body[4..8]);
        let child_size = LittleEndian::read_u32(&self.body[8..12]);
        let raw_child = LittleEndian::read_u32(&self.body[12..16]);
        let child_type = PodType::from_wire(raw_child).ok_or_else(|| PodDecodeError::Malformed {
            offset: self.offset,
            reason: format!("unknown choice child tag {raw_child}"),
        })?;
        let elems = &self.body[16..];
        check_elements(elems.len(), child_size, self.offset)?;
        let n = if child_size == 0 {
            0
        } else {
            elems.len() / child_size as usize
        };
        if choice_type == ChoiceType::None && n != 1 {
            return Err(PodDecodeError::Malformed {
                offset: self.offset,
                reason: format!("degenerate choice holds {n} values, expected 1"),
            });
        }
        if n < choice_type.min_values() {
            return Err(PodDecodeError::Malformed {
                offset: self.offset,
                reason: format!(
                    "{choice_type} choice holds {n} values, expected at least {}",
                    choice_type.min_values()
                ),
            });
        }
        Ok(ChoicePod {
            choice_type,
            flags,
            child_type,
            child_size,
            elems,
            offset: self.offset,
        })
    }

    pub fn as_property(&self) -> Result<PropertyPod<'a>, PodDecodeError> {
        self.expect(PodType::Property)?;
        if self.body.len() < 8 {
            return Err(PodDecodeError::Malformed {
                offset: self.offset,
                reason: "property body too short".into(),
            });
        }
        let value = parse_in(self.body, 8, self.offset + POD_HEADER_SIZE)?;
        Ok(PropertyPod {
            key: LittleEndian::read_u32(&self.body[..4]),
            flags: LittleEndian::read_u32(&self.body[4..8]),
            value,
            offset: self.offset,
        })
    }

    pub fn as_sequence(&self) -> Result<SequencePod<'a>, PodDecodeError> {
        self.expect(PodType::Sequence)?;
        if self.body.len() < 8 {
            return Err(PodDecodeError::Malformed {
                offset: self.offset,
                reason: "sequence body too short".into(),
            });
        }
        Ok(SequencePod {
            unit: LittleEndian::read_u32(&self.body[..4]),
            body: &self.body[8..],
            base: self.offset + POD_HEADER_SIZE + 8,
            offset: self.offset,
        })
    }

    /// Uniform choice view: a Choice is described as-is, anything else is a
    /// degenerate `(1, None, value)`. Readers treat both encodings of a
    /// single value identically through this view.
    pub fn values(&self) -> Result<Values<'a>, PodDecodeError> {
        if self.ty == PodType::Choice {
            let c = self.as_choice()?;
            Ok(Values {
                n_values: c.len() as u32,
                choice_type: c.choice_type,
                child_type: c.child_type,
                child_size: c.child_size,
                elems: c.elems,
                offset: c.offset,
            })
        } else {
            Ok(Values {
                n_values: 1,
                choice_type: ChoiceType::None,
                child_type: self.ty,
                child_size: self.body.len() as u32,
                elems: self.body,
                offset: self.offset,
            })
        }
    }
}

/// Elements must tile the stream exactly (every element has exactly
/// `child_size` bytes of body).
fn check_elements(len: usize, child_size: u32, offset: usize) -> Result<(), PodDecodeError> {
    if child_size == 0 {
        if len != 0 {
            return Err(PodDecodeError::Malformed {
                offset,
                reason: "zero-size elements in a non-empty stream".into(),
            });
        }
        return Ok(());
    }
    if len % child_size as usize != 0 {
        return Err(PodDecodeError::Malformed {
            offset,
            reason: format!("element stream of {len} bytes is not a multiple of {child_size}"),
        });
    }
    Ok(())
}

/// Iterator over sibling pods in encounter order.
pub struct PodIter<'a> {
    body: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> PodIter<'a> {
    fn new(body: &'a [u8], base: usize) -> Self {
        Self { body, pos: 0, base }
    }
}

impl<'a> Iterator for PodIter<'a> {
    type Item = Result<Pod<'a>, PodDecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.body.len() {
            return None;
        }
        match parse_in(self.body, self.pos, self.base) {
            Ok(pod) => {
                // The final child may omit trailing padding inside the parent.
                self.pos = (self.pos + pod.footprint()).min(self.body.len());
                Some(Ok(pod))
            }
            Err(e) => {
                // Stop after the first error so the caller sees it once.
                self.pos = self.body.len();
                Some(Err(e))
            }
        }
    }
}

/// Object view: `(object_type, object_id)` plus property children.
#[derive(Debug, Clone, Copy)]
pub struct ObjectPod<'a> {
    pub object_type: u32,
    pub object_id: u32,
    body: &'a [u8],
    base: usize,
    offset: usize,
}

impl<'a> ObjectPod<'a> {
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Raw children without the property requirement.
    ///
    /// Current trees always hold properties here; the compat layer uses
    /// this to walk legacy objects whose children are bare pods.
    pub fn children(&self) -> PodIter<'a> {
        PodIter::new(self.body, self.base)
    }

    /// Property children; a non-property child is malformed.
    pub fn properties(&self) -> PropertyIter<'a> {
        PropertyIter {
            inner: self.children(),
        }
    }

    /// Linear scan; with duplicated keys the first match wins.
    pub fn find_prop(&self, key: u32) -> Result<Option<PropertyPod<'a>>, PodDecodeError> {
        for prop in self.properties() {
            let prop = prop?;
            if prop.key == key {
                return Ok(Some(prop));
            }
        }
        Ok(None)
    }
}

/// Property: `(key, flags, value)`.
#[derive(Debug, Clone, Copy)]
pub struct PropertyPod<'a> {
    pub key: u32,
    pub flags: u32,
    pub value: Pod<'a>,
    offset: usize,
}

impl PropertyPod<'_> {
    pub fn offset(&self) -> usize {
        self.offset
    }
}

pub struct PropertyIter<'a> {
    inner: PodIter<'a>,
}

impl<'a> Iterator for PropertyIter<'a> {
    type Item = Result<PropertyPod<'a>, PodDecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let pod = match self.inner.next()? {
            Ok(pod) => pod,
            Err(e) => return Some(Err(e)),
        };
        if pod.type_() != PodType::Property {
            return Some(Err(PodDecodeError::Malformed {
                offset: pod.offset(),
                reason: format!("object child is a {}, not a property", pod.type_()),
            }));
        }
        Some(pod.as_property())
    }
}

/// Array view: homogeneous fixed-size element bodies.
#[derive(Debug, Clone, Copy)]
pub struct ArrayPod<'a> {
    pub child_type: PodType,
    pub child_size: u32,
    elems: &'a [u8],
    offset: usize,
}

impl<'a> ArrayPod<'a> {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        element_count(self.elems.len(), self.child_size)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element(&self, i: usize) -> Option<&'a [u8]> {
        element_at(self.elems, self.child_size, i)
    }

    pub fn elements(&self) -> impl Iterator<Item = &'a [u8]> {
        let elems = self.elems;
        let cs = self.child_size;
        (0..self.len()).filter_map(move |i| element_at(elems, cs, i))
    }
}

/// Choice view: constraint descriptor over homogeneous alternatives.
#[derive(Debug, Clone, Copy)]
pub struct ChoicePod<'a> {
    pub choice_type: ChoiceType,
    pub flags: u32,
    pub child_type: PodType,
    pub child_size: u32,
    elems: &'a [u8],
    offset: usize,
}

impl<'a> ChoicePod<'a> {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        element_count(self.elems.len(), self.child_size)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element(&self, i: usize) -> Option<&'a [u8]> {
        element_at(self.elems, self.child_size, i)
    }

    pub fn elements(&self) -> impl Iterator<Item = &'a [u8]> {
        let elems = self.elems;
        let cs = self.child_size;
        (0..self.len()).filter_map(move |i| element_at(elems, cs, i))
    }
}

/// Sequence view: timestamped control stream.
#[derive(Debug, Clone, Copy)]
pub struct SequencePod<'a> {
    pub unit: u32,
    body: &'a [u8],
    base: usize,
    offset: usize,
}

impl<'a> SequencePod<'a> {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn controls(&self) -> ControlIter<'a> {
        ControlIter {
            body: self.body,
            pos: 0,
            base: self.base,
        }
    }
}

/// One control point: offset in sequence units, control type, value.
#[derive(Debug, Clone, Copy)]
pub struct Control<'a> {
    pub offset: u32,
    pub ctl_type: u32,
    pub value: Pod<'a>,
}

pub struct ControlIter<'a> {
    body: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Iterator for ControlIter<'a> {
    type Item = Result<Control<'a>, PodDecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.body.len() {
            return None;
        }
        if self.body.len() - self.pos < 8 {
            self.pos = self.body.len();
            return Some(Err(PodDecodeError::Malformed {
                offset: self.base + self.pos,
                reason: "truncated control header".into(),
            }));
        }
        let offset = LittleEndian::read_u32(&self.body[self.pos..self.pos + 4]);
        let ctl_type = LittleEndian::read_u32(&self.body[self.pos + 4..self.pos + 8]);
        match parse_in(self.body, self.pos + 8, self.base) {
            Ok(value) => {
                self.pos = (self.pos + 8 + value.footprint()).min(self.body.len());
                Some(Ok(Control {
                    offset,
                    ctl_type,
                    value,
                }))
            }
            Err(e) => {
                self.pos = self.body.len();
                Some(Err(e))
            }
        }
    }
}

/// Uniform `(n_values, choice_type, child)` view over a property value.
#[derive(Debug, Clone, Copy)]
pub struct Values<'a> {
    pub n_values: u32,
    pub choice_type: ChoiceType,
    pub child_type: PodType,
    pub child_size: u32,
    elems: &'a [u8],
    offset: usize,
}

impl<'a> Values<'a> {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.n_values as usize
    }

    pub fn is_empty(&self) -> bool {
        self.n_values == 0
    }

    pub fn element(&self, i: usize) -> Option<&'a [u8]> {
        if self.child_size == 0 {
            // A None value has an empty body; it still counts as one element.
            return (i < self.len()).then_some(&self.elems[..0]);
        }
        element_at(self.elems, self.child_size, i)
    }

    pub fn elements(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.len()).filter_map(move |i| self.element(i))
    }

    /// Identifier element, used when translating ids element-wise.
    pub fn id_at(&self, i: usize) -> Result<u32, PodDecodeError> {
        if self.child_type != PodType::Id {
            return Err(PodDecodeError::TypeMismatch {
                expected: PodType::Id,
                found: self.child_type,
            });
        }
        match self.element(i) {
            Some(b) if b.len() >= 4 => Ok(LittleEndian::read_u32(b)),
            _ => Err(PodDecodeError::Malformed {
                offset: self.offset,
                reason: format!("missing id element {i}"),
            }),
        }
    }
}

fn element_count(len: usize, child_size: u32) -> usize {
    if child_size == 0 {
        0
    } else {
        len / child_size as usize
    }
}

fn element_at(elems: &[u8], child_size: u32, i: usize) -> Option<&[u8]> {
    let cs = child_size as usize;
    if cs == 0 {
        return None;
    }
    let start = i.checked_mul(cs)?;
    let end = start.checked_add(cs)?;
    if end <= elems.len() {
        Some(&elems[start..end])
    } else {
        None
    }
}

/// Frame of an entered container.
struct ParserFrame {
    /// Absolute end of the container body.
    end: usize,
    /// Cursor position once the container is left.
    next: usize,
}

/// Sequential cursor: typed getters in declared order, balanced
/// `enter`/`leave` for structs and objects.
pub struct PodParser<'a> {
    data: &'a [u8],
    pos: usize,
    frames: Vec<ParserFrame>,
}

impl<'a> PodParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            frames: Vec::new(),
        }
    }

    fn limit(&self) -> usize {
        self.frames.last().map_or(self.data.len(), |f| f.end)
    }

    pub fn remaining(&self) -> usize {
        self.limit().saturating_sub(self.pos)
    }

    fn current(&self) -> Result<Pod<'a>, PodDecodeError> {
        parse_in(&self.data[..self.limit()], self.pos, 0)
    }

    /// Tag of the next value without advancing.
    pub fn peek_type(&self) -> Result<PodType, PodDecodeError> {
        self.current().map(|p| p.type_())
    }

    /// Next child in encounter order, or `None` at the end of the
    /// current container.
    pub fn next(&mut self) -> Result<Option<Pod<'a>>, PodDecodeError> {
        if self.pos >= self.limit() {
            return Ok(None);
        }
        let pod = self.current()?;
        self.pos = (self.pos + pod.footprint()).min(self.limit());
        Ok(Some(pod))
    }

    fn next_required(&mut self) -> Result<Pod<'a>, PodDecodeError> {
        match self.next()? {
            Some(pod) => Ok(pod),
            None => Err(PodDecodeError::Malformed {
                offset: self.pos,
                reason: "unexpected end of container".into(),
            }),
        }
    }

    pub fn get_pod(&mut self) -> Result<Pod<'a>, PodDecodeError> {
        self.next_required()
    }

    pub fn get_bool(&mut self) -> Result<bool, PodDecodeError> {
        self.next_required()?.as_bool()
    }

    pub fn get_id(&mut self) -> Result<u32, PodDecodeError> {
        self.next_required()?.as_id()
    }

    pub fn get_int(&mut self) -> Result<i32, PodDecodeError> {
        self.next_required()?.as_int()
    }

    pub fn get_long(&mut self) -> Result<i64, PodDecodeError> {
        self.next_required()?.as_long()
    }

    pub fn get_float(&mut self) -> Result<f32, PodDecodeError> {
        self.next_required()?.as_float()
    }

    pub fn get_double(&mut self) -> Result<f64, PodDecodeError> {
        self.next_required()?.as_double()
    }

    pub fn get_string(&mut self) -> Result<&'a str, PodDecodeError> {
        self.next_required()?.as_str()
    }

    pub fn get_bytes(&mut self) -> Result<&'a [u8], PodDecodeError> {
        self.next_required()?.as_bytes()
    }

    pub fn get_rectangle(&mut self) -> Result<Rectangle, PodDecodeError> {
        self.next_required()?.as_rectangle()
    }

    pub fn get_fraction(&mut self) -> Result<Fraction, PodDecodeError> {
        self.next_required()?.as_fraction()
    }

    pub fn get_fd(&mut self) -> Result<i64, PodDecodeError> {
        self.next_required()?.as_fd()
    }

    pub fn get_pointer(&mut self) -> Result<(u32, u64), PodDecodeError> {
        self.next_required()?.as_pointer()
    }

    fn push_frame(&mut self, end: usize, next: usize) -> Result<(), PodDecodeError> {
        if self.frames.len() >= MAX_NESTING_DEPTH {
            return Err(PodDecodeError::DepthLimit {
                current: self.frames.len() + 1,
                max: MAX_NESTING_DEPTH,
            });
        }
        self.frames.push(ParserFrame { end, next });
        Ok(())
    }

    /// Opens the struct at the cursor and positions on its first child.
    pub fn enter_struct(&mut self) -> Result<(), PodDecodeError> {
        let pod = self.current()?;
        pod.expect(PodType::Struct)?;
        let body_start = self.pos + POD_HEADER_SIZE;
        let next = (self.pos + pod.footprint()).min(self.limit());
        self.push_frame(body_start + pod.size(), next)?;
        self.pos = body_start;
        Ok(())
    }

    /// Opens the object at the cursor; returns `(object_type, object_id)`
    /// and positions on the first property.
    pub fn enter_object(&mut self) -> Result<(u32, u32), PodDecodeError> {
        let pod = self.current()?;
        let obj = pod.as_object()?;
        let body_start = self.pos + POD_HEADER_SIZE;
        let next = (self.pos + pod.footprint()).min(self.limit());
        self.push_frame(body_start + pod.size(), next)?;
        self.pos = body_start + 8;
        Ok((obj.object_type, obj.object_id))
    }

    /// Leaves the innermost container, skipping unread children.
    pub fn leave(&mut self) -> Result<(), PodDecodeError> {
        let frame = self.frames.pop().ok_or_else(|| PodDecodeError::Malformed {
            offset: self.pos,
            reason: "leave without a matching enter".into(),
        })?;
        self.pos = frame.next;
        Ok(())
    }
}
