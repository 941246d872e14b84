//! Построение POD-деревьев в буфер вызывающей стороны.
//!
//! Билдер ведёт стек открытых кадров: кадр запоминает смещение заголовка
//! контейнера, размер которого ещё неизвестен. `close()` дописывает размер
//! задним числом и выравнивает тело. При нехватке места билдер переходит в
//! режим переполнения: логический курсор продолжает расти, запись
//! прекращается, а итоговое `finish()` сообщает требуемую ёмкость.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::encode::PodEncodeError;

use super::parser::Pod;
use super::types::{align8, ChoiceType, Fraction, PodType, Rectangle, MAX_NESTING_DEPTH, POD_HEADER_SIZE};

/// Открытый контейнер: смещение заголовка и ограничение на элементы.
struct Frame {
    offset: usize,
    container: PodType,
    /// Для Array/Choice: (тип, размер) каждого элемента.
    child: Option<(PodType, u32)>,
}

pub struct PodBuilder<'a> {
    data: &'a mut [u8],
    /// Логический курсор; может превышать ёмкость буфера.
    pos: usize,
    frames: Vec<Frame>,
}

impl<'a> PodBuilder<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self {
            data,
            pos: 0,
            frames: Vec::new(),
        }
    }

    /// Буфер уже переполнен?
    pub fn overflowed(&self) -> bool {
        self.pos > self.data.len()
    }

    /// Ёмкость, которой хватило бы на всё записанное к этому моменту.
    pub fn required(&self) -> usize {
        self.pos
    }

    // --- Низкоуровневая запись ---

    /// Копирует байты, которые помещаются, и всегда продвигает курсор.
    fn put(&mut self, bytes: &[u8]) {
        if self.pos < self.data.len() {
            let n = bytes.len().min(self.data.len() - self.pos);
            self.data[self.pos..self.pos + n].copy_from_slice(&bytes[..n]);
        }
        self.pos += bytes.len();
    }

    fn put_u32(&mut self, v: u32) {
        let mut b = [0u8; 4];
        LittleEndian::write_u32(&mut b, v);
        self.put(&b);
    }

    /// Правка задним числом; в усечённую область не пишет.
    fn patch_u32(&mut self, at: usize, v: u32) {
        if at + 4 <= self.data.len() {
            LittleEndian::write_u32(&mut self.data[at..at + 4], v);
        }
    }

    fn pad(&mut self) {
        const ZEROS: [u8; 8] = [0u8; 8];
        let n = align8(self.pos) - self.pos;
        if n > 0 {
            self.put(&ZEROS[..n]);
        }
    }

    fn header(&mut self, size: u32, t: PodType) {
        self.put_u32(size);
        self.put_u32(t as u32);
    }

    fn in_element_stream(&self) -> bool {
        matches!(
            self.frames.last(),
            Some(f) if matches!(f.container, PodType::Array | PodType::Choice)
        )
    }

    /// Дописывает сырые байты без заголовка и проверок.
    ///
    /// Используется внутри потоков элементов Array/Choice, где тег задан
    /// контейнером, и при дословном копировании уже готовых тел.
    pub fn raw(&mut self, bytes: &[u8]) {
        self.put(bytes);
    }

    /// Записывает одно значение с тегом `t` и телом `body`.
    ///
    /// Внутри Array/Choice пишется только тело: заголовок подразумевается
    /// контейнером, а первый элемент Choice фиксирует тип и размер
    /// элементов. Вне потока элементов значение получает заголовок и
    /// выравнивание.
    pub fn write_value(&mut self, t: PodType, body: &[u8]) -> Result<(), PodEncodeError> {
        let element = match self.frames.last() {
            Some(f) if matches!(f.container, PodType::Array | PodType::Choice) => {
                Some((f.child, f.offset))
            }
            _ => None,
        };
        if let Some((declared, offset)) = element {
            let size = body.len() as u32;
            match declared {
                Some((ct, cs)) => {
                    if ct != t || cs != size {
                        return Err(PodEncodeError::Shape(format!(
                            "heterogeneous element: container holds {ct}/{cs} bytes, got {t}/{size} bytes"
                        )));
                    }
                }
                None => {
                    if t.fixed_body_size() != Some(size) {
                        return Err(PodEncodeError::Shape(format!(
                            "{t}/{size} is not a fixed-size choice element"
                        )));
                    }
                    // Первый элемент Choice определяет тип элементов;
                    // дописываем его в заголовок контейнера.
                    self.patch_u32(offset + POD_HEADER_SIZE + 8, size);
                    self.patch_u32(offset + POD_HEADER_SIZE + 12, t as u32);
                    if let Some(f) = self.frames.last_mut() {
                        f.child = Some((t, size));
                    }
                }
            }
            self.put(body);
        } else {
            self.header(body.len() as u32, t);
            self.put(body);
            self.pad();
        }
        Ok(())
    }

    // --- Примитивы ---

    pub fn write_none(&mut self) -> Result<(), PodEncodeError> {
        self.write_value(PodType::None, &[])
    }

    pub fn write_bool(&mut self, v: bool) -> Result<(), PodEncodeError> {
        let mut b = [0u8; 4];
        LittleEndian::write_u32(&mut b, v as u32);
        self.write_value(PodType::Bool, &b)
    }

    pub fn write_id(&mut self, v: u32) -> Result<(), PodEncodeError> {
        let mut b = [0u8; 4];
        LittleEndian::write_u32(&mut b, v);
        self.write_value(PodType::Id, &b)
    }

    pub fn write_int(&mut self, v: i32) -> Result<(), PodEncodeError> {
        let mut b = [0u8; 4];
        LittleEndian::write_i32(&mut b, v);
        self.write_value(PodType::Int, &b)
    }

    pub fn write_long(&mut self, v: i64) -> Result<(), PodEncodeError> {
        let mut b = [0u8; 8];
        LittleEndian::write_i64(&mut b, v);
        self.write_value(PodType::Long, &b)
    }

    pub fn write_float(&mut self, v: f32) -> Result<(), PodEncodeError> {
        let mut b = [0u8; 4];
        LittleEndian::write_f32(&mut b, v);
        self.write_value(PodType::Float, &b)
    }

    pub fn write_double(&mut self, v: f64) -> Result<(), PodEncodeError> {
        let mut b = [0u8; 8];
        LittleEndian::write_f64(&mut b, v);
        self.write_value(PodType::Double, &b)
    }

    /// Строка уходит на провод с завершающим NUL, он входит в размер.
    pub fn write_string(&mut self, s: &str) -> Result<(), PodEncodeError> {
        let mut body = Vec::with_capacity(s.len() + 1);
        body.extend_from_slice(s.as_bytes());
        body.push(0);
        self.write_value(PodType::String, &body)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), PodEncodeError> {
        self.write_value(PodType::Bytes, bytes)
    }

    pub fn write_rectangle(&mut self, r: Rectangle) -> Result<(), PodEncodeError> {
        let mut b = [0u8; 8];
        LittleEndian::write_u32(&mut b[..4], r.width);
        LittleEndian::write_u32(&mut b[4..], r.height);
        self.write_value(PodType::Rectangle, &b)
    }

    pub fn write_fraction(&mut self, f: Fraction) -> Result<(), PodEncodeError> {
        let mut b = [0u8; 8];
        LittleEndian::write_u32(&mut b[..4], f.num);
        LittleEndian::write_u32(&mut b[4..], f.denom);
        self.write_value(PodType::Fraction, &b)
    }

    /// Указатель никогда не разыменовывается на проводе; значение имеет
    /// смысл только внутри процесса.
    pub fn write_pointer(&mut self, ptr_type: u32, value: u64) -> Result<(), PodEncodeError> {
        let mut b = [0u8; 16];
        LittleEndian::write_u32(&mut b[..4], ptr_type);
        LittleEndian::write_u64(&mut b[8..], value);
        self.write_value(PodType::Pointer, &b)
    }

    pub fn write_fd(&mut self, fd: i64) -> Result<(), PodEncodeError> {
        let mut b = [0u8; 8];
        LittleEndian::write_i64(&mut b, fd);
        self.write_value(PodType::Fd, &b)
    }

    /// Дословная копия готового поддерева.
    pub fn write_pod(&mut self, pod: &Pod<'_>) -> Result<(), PodEncodeError> {
        self.write_value(pod.type_(), pod.body())
    }

    // --- Контейнеры ---

    fn open(&mut self, t: PodType, child: Option<(PodType, u32)>) -> Result<(), PodEncodeError> {
        if self.in_element_stream() {
            return Err(PodEncodeError::Shape(format!(
                "{t} container cannot be an Array/Choice element"
            )));
        }
        if self.frames.len() >= MAX_NESTING_DEPTH {
            return Err(PodEncodeError::Shape(format!(
                "nesting deeper than {MAX_NESTING_DEPTH}"
            )));
        }
        self.frames.push(Frame {
            offset: self.pos,
            container: t,
            child,
        });
        self.header(0, t);
        Ok(())
    }

    pub fn open_struct(&mut self) -> Result<(), PodEncodeError> {
        self.open(PodType::Struct, None)
    }

    /// Тип элементов массива ограничен примитивами фиксированного размера.
    pub fn open_array(&mut self, child_type: PodType, child_size: u32) -> Result<(), PodEncodeError> {
        match child_type.fixed_body_size() {
            Some(s) if s == child_size => {}
            _ => {
                return Err(PodEncodeError::Shape(format!(
                    "{child_type}/{child_size} is not a fixed-size array element"
                )))
            }
        }
        self.open(PodType::Array, Some((child_type, child_size)))?;
        self.put_u32(child_size);
        self.put_u32(child_type as u32);
        Ok(())
    }

    pub fn open_object(&mut self, object_type: u32, object_id: u32) -> Result<(), PodEncodeError> {
        self.open(PodType::Object, None)?;
        self.put_u32(object_type);
        self.put_u32(object_id);
        Ok(())
    }

    /// Тип и размер элементов допишет первый `write_*` внутри кадра.
    pub fn open_choice(&mut self, choice_type: ChoiceType, flags: u32) -> Result<(), PodEncodeError> {
        self.open(PodType::Choice, None)?;
        self.put_u32(choice_type as u32);
        self.put_u32(flags);
        self.put_u32(0); // child_size
        self.put_u32(0); // child_type
        Ok(())
    }

    pub fn open_sequence(&mut self, unit: u32) -> Result<(), PodEncodeError> {
        self.open(PodType::Sequence, None)?;
        self.put_u32(unit);
        self.put_u32(0); // pad
        Ok(())
    }

    /// Кадр свойства допустим только внутри Object.
    pub fn open_property(&mut self, key: u32, flags: u32) -> Result<(), PodEncodeError> {
        match self.frames.last() {
            Some(f) if f.container == PodType::Object => {}
            _ => {
                return Err(PodEncodeError::Shape(
                    "property frame outside an object".into(),
                ))
            }
        }
        self.open(PodType::Property, None)?;
        self.put_u32(key);
        self.put_u32(flags);
        Ok(())
    }

    /// Заголовок контрольной точки внутри Sequence; следом записывается
    /// значение обычным `write_*`.
    pub fn write_control(&mut self, offset: u32, ctl_type: u32) -> Result<(), PodEncodeError> {
        match self.frames.last() {
            Some(f) if f.container == PodType::Sequence => {}
            _ => {
                return Err(PodEncodeError::Shape(
                    "control written outside a sequence".into(),
                ))
            }
        }
        self.put_u32(offset);
        self.put_u32(ctl_type);
        Ok(())
    }

    /// Закрывает верхний кадр: дописывает размер тела в заголовок и
    /// выравнивает хвост. Это единственная операция, которая пишет позади
    /// курсора; после закрытия внешнего кадра дерево неизменно.
    pub fn close(&mut self) -> Result<(), PodEncodeError> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| PodEncodeError::Shape("close without an open frame".into()))?;
        let size = self.pos - frame.offset - POD_HEADER_SIZE;
        self.patch_u32(frame.offset, size as u32);
        self.pad();
        Ok(())
    }

    /// Завершает построение: все кадры должны быть закрыты.
    ///
    /// Возвращает число занятых байт либо `Overflow` с ёмкостью, которой
    /// хватит для повторной попытки.
    pub fn finish(self) -> Result<usize, PodEncodeError> {
        if !self.frames.is_empty() {
            return Err(PodEncodeError::Shape(format!(
                "{} frame(s) left open",
                self.frames.len()
            )));
        }
        if self.pos > self.data.len() {
            return Err(PodEncodeError::Overflow { required: self.pos });
        }
        Ok(self.pos)
    }
}
