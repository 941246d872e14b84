//! Пересечение свойств при согласовании параметров.
//!
//! Оба операнда приводятся к единому представлению Choice (см.
//! [`Pod::values`]), после чего ограничения пересекаются по виду:
//! перечисления — по равенству значений, диапазоны — по границам,
//! смешанные пары — отбором элементов перечисления внутри диапазона.
//! Пустой результат — это отказ согласования, а не пустой Choice.
//!
//! Функции чистые: читают два дерева, пишут результат в билдер
//! вызывающей стороны и не держат никакого состояния.

use std::borrow::Cow;
use std::cmp::Ordering;

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use crate::error::decode::PodDecodeError;
use crate::error::filter::FilterError;

use super::builder::PodBuilder;
use super::parser::{ObjectPod, Pod, Values};
use super::types::{ChoiceType, PodType};

/// Пересекает значения двух свойств и записывает результат в `out`.
///
/// Каждый вход — либо Choice, либо голое значение; единое представление
/// уравнивает оба. Результат с ограничением `None` сворачивается до
/// голого значения.
pub fn filter_values(
    a: &Pod<'_>,
    b: &Pod<'_>,
    out: &mut PodBuilder<'_>,
) -> Result<(), FilterError> {
    let va = a.values()?;
    let vb = b.values()?;
    let (choice_type, elements) = intersect(&va, &vb)?;
    emit(out, choice_type, va.child_type, &elements)
}

/// Пересекает два объекта одного типа свойство за свойством.
///
/// Общие ключи пересекаются; ключи, присутствующие только на одной
/// стороне, копируются как есть. Порядок: сначала свойства первого
/// операнда, затем уникальные свойства второго.
pub fn filter_object(
    a: &ObjectPod<'_>,
    b: &ObjectPod<'_>,
    out: &mut PodBuilder<'_>,
) -> Result<(), FilterError> {
    if a.object_type != b.object_type {
        return Err(FilterError::ObjectMismatch {
            a: a.object_type,
            b: b.object_type,
        });
    }
    debug!(
        "filtering object {:#x} id {} against id {}",
        a.object_type, a.object_id, b.object_id
    );

    out.open_object(a.object_type, a.object_id)?;
    for prop in a.properties() {
        let pa = prop?;
        match b.find_prop(pa.key)? {
            None => {
                out.open_property(pa.key, pa.flags)?;
                out.write_pod(&pa.value)?;
                out.close()?;
            }
            Some(pb) => {
                let va = pa.value.values()?;
                let vb = pb.value.values()?;
                let (choice_type, elements) = intersect(&va, &vb)?;
                out.open_property(pa.key, pa.flags & pb.flags)?;
                emit(out, choice_type, va.child_type, &elements)?;
                out.close()?;
            }
        }
    }
    for prop in b.properties() {
        let pb = prop?;
        if a.find_prop(pb.key)?.is_none() {
            out.open_property(pb.key, pb.flags)?;
            out.write_pod(&pb.value)?;
            out.close()?;
        }
    }
    out.close()?;
    Ok(())
}

/// Элементы результата: почти всегда срезы операндов, но границы
/// прямоугольных диапазонов собираются покомпонентно и живут отдельно.
type Elements<'a> = Vec<Cow<'a, [u8]>>;

fn emit(
    out: &mut PodBuilder<'_>,
    choice_type: ChoiceType,
    child_type: PodType,
    elements: &[Cow<'_, [u8]>],
) -> Result<(), FilterError> {
    match elements.split_first() {
        None => Err(FilterError::NoIntersection),
        Some((first, rest)) => {
            if choice_type == ChoiceType::None {
                // Одно значение без ограничения — пишем голым.
                out.write_value(child_type, first)?;
                return Ok(());
            }
            out.open_choice(choice_type, 0)?;
            out.write_value(child_type, first)?;
            for e in rest {
                out.write_value(child_type, e)?;
            }
            out.close()?;
            Ok(())
        }
    }
}

fn element<'a>(v: &Values<'a>, i: usize) -> Result<&'a [u8], FilterError> {
    v.element(i).ok_or_else(|| {
        FilterError::Decode(PodDecodeError::Malformed {
            offset: v.offset(),
            reason: format!("missing choice element {i}"),
        })
    })
}

fn intersect<'a>(
    va: &Values<'a>,
    vb: &Values<'a>,
) -> Result<(ChoiceType, Elements<'a>), FilterError> {
    if va.child_type != vb.child_type || va.child_size != vb.child_size {
        return Err(FilterError::NoIntersection);
    }
    let ct = va.child_type;

    match (va.choice_type, vb.choice_type) {
        (ChoiceType::None, ChoiceType::None) => {
            let x = element(va, 0)?;
            let y = element(vb, 0)?;
            if x == y {
                Ok((ChoiceType::None, vec![Cow::Borrowed(x)]))
            } else {
                Err(FilterError::NoIntersection)
            }
        }
        // Значение без ограничения уступает ограничению другой стороны.
        (ChoiceType::None, _) => Ok((vb.choice_type, vb.elements().map(Cow::Borrowed).collect())),
        (_, ChoiceType::None) => Ok((va.choice_type, va.elements().map(Cow::Borrowed).collect())),

        (ChoiceType::Enum, ChoiceType::Enum) | (ChoiceType::Flags, ChoiceType::Flags) => {
            let mut kept = Vec::new();
            for e in va.elements() {
                if vb.elements().any(|f| f == e) {
                    kept.push(Cow::Borrowed(e));
                }
            }
            if kept.is_empty() {
                return Err(FilterError::NoIntersection);
            }
            Ok((va.choice_type, kept))
        }

        (ChoiceType::Enum, ChoiceType::Range) => enum_in_range(va, vb, ct),
        (ChoiceType::Range, ChoiceType::Enum) => enum_in_range(vb, va, ct),

        // Оси прямоугольника независимы: границы пересекаются
        // покомпонентно, скалярного порядка на них нет.
        (ChoiceType::Range, ChoiceType::Range) if ct == PodType::Rectangle => {
            let (dflt, min, max) = rect_range_merge(va, vb)?;
            Ok((ChoiceType::Range, vec![dflt, min, max]))
        }

        (ChoiceType::Step, ChoiceType::Step) if ct == PodType::Rectangle => {
            let (dflt, min, max) = rect_range_merge(va, vb)?;
            // Шаг остаётся от первого операнда.
            let step = Cow::Borrowed(element(va, 3)?);
            Ok((ChoiceType::Step, vec![dflt, min, max, step]))
        }

        (ChoiceType::Range, ChoiceType::Range) => {
            let dflt = max_of(ct, element(va, 0)?, element(vb, 0)?)?;
            let min = max_of(ct, element(va, 1)?, element(vb, 1)?)?;
            let max = min_of(ct, element(va, 2)?, element(vb, 2)?)?;
            if cmp(ct, min, max)? == Ordering::Greater {
                return Err(FilterError::NoIntersection);
            }
            Ok((
                ChoiceType::Range,
                vec![Cow::Borrowed(dflt), Cow::Borrowed(min), Cow::Borrowed(max)],
            ))
        }

        (ChoiceType::Step, ChoiceType::Step) => {
            let dflt = max_of(ct, element(va, 0)?, element(vb, 0)?)?;
            let min = max_of(ct, element(va, 1)?, element(vb, 1)?)?;
            let max = min_of(ct, element(va, 2)?, element(vb, 2)?)?;
            if cmp(ct, min, max)? == Ordering::Greater {
                return Err(FilterError::NoIntersection);
            }
            // Шаг остаётся от первого операнда.
            Ok((
                ChoiceType::Step,
                vec![
                    Cow::Borrowed(dflt),
                    Cow::Borrowed(min),
                    Cow::Borrowed(max),
                    Cow::Borrowed(element(va, 3)?),
                ],
            ))
        }

        // Несовместимые виды ограничений: ничто не удовлетворяет обоим.
        _ => Err(FilterError::NoIntersection),
    }
}

/// Покомпонентное пересечение прямоугольных диапазонов: нижняя граница —
/// максимум нижних по каждой оси, верхняя — минимум верхних; значение по
/// умолчанию — покомпонентный максимум значений по умолчанию.
fn rect_range_merge<'a>(
    va: &Values<'a>,
    vb: &Values<'a>,
) -> Result<(Cow<'a, [u8]>, Cow<'a, [u8]>, Cow<'a, [u8]>), FilterError> {
    let d1 = read_rect(element(va, 0)?)?;
    let m1 = read_rect(element(va, 1)?)?;
    let x1 = read_rect(element(va, 2)?)?;
    let d2 = read_rect(element(vb, 0)?)?;
    let m2 = read_rect(element(vb, 1)?)?;
    let x2 = read_rect(element(vb, 2)?)?;

    let min = (m1.0.max(m2.0), m1.1.max(m2.1));
    let max = (x1.0.min(x2.0), x1.1.min(x2.1));
    if min.0 > max.0 || min.1 > max.1 {
        return Err(FilterError::NoIntersection);
    }
    let dflt = (d1.0.max(d2.0), d1.1.max(d2.1));
    Ok((rect_body(dflt), rect_body(min), rect_body(max)))
}

fn read_rect(b: &[u8]) -> Result<(u32, u32), FilterError> {
    if b.len() < 8 {
        return Err(FilterError::NoIntersection);
    }
    Ok((
        LittleEndian::read_u32(&b[..4]),
        LittleEndian::read_u32(&b[4..8]),
    ))
}

fn rect_body((w, h): (u32, u32)) -> Cow<'static, [u8]> {
    let mut b = vec![0u8; 8];
    LittleEndian::write_u32(&mut b[..4], w);
    LittleEndian::write_u32(&mut b[4..8], h);
    Cow::Owned(b)
}

/// Есть ли у тел этого типа порядок, пригодный для диапазонов.
fn orderable(t: PodType) -> bool {
    matches!(
        t,
        PodType::Bool
            | PodType::Id
            | PodType::Int
            | PodType::Long
            | PodType::Float
            | PodType::Double
            | PodType::Rectangle
            | PodType::Fraction
    )
}

fn enum_in_range<'a>(
    e: &Values<'a>,
    r: &Values<'a>,
    ct: PodType,
) -> Result<(ChoiceType, Elements<'a>), FilterError> {
    if !orderable(ct) {
        return Err(FilterError::NoIntersection);
    }
    let min = element(r, 1)?;
    let max = element(r, 2)?;
    let mut kept = Vec::new();
    for x in e.elements() {
        // Несравнимое значение (например, прямоугольник, больший по
        // одной оси и меньший по другой) просто не попадает в диапазон.
        let ge_min = matches!(
            compare_bodies(ct, x, min),
            Some(Ordering::Greater | Ordering::Equal)
        );
        let le_max = matches!(
            compare_bodies(ct, x, max),
            Some(Ordering::Less | Ordering::Equal)
        );
        if ge_min && le_max {
            kept.push(Cow::Borrowed(x));
        }
    }
    if kept.is_empty() {
        return Err(FilterError::NoIntersection);
    }
    Ok((ChoiceType::Enum, kept))
}

fn cmp(t: PodType, a: &[u8], b: &[u8]) -> Result<Ordering, FilterError> {
    compare_bodies(t, a, b).ok_or(FilterError::NoIntersection)
}

fn max_of<'a>(t: PodType, a: &'a [u8], b: &'a [u8]) -> Result<&'a [u8], FilterError> {
    Ok(if cmp(t, a, b)? == Ordering::Less { b } else { a })
}

fn min_of<'a>(t: PodType, a: &'a [u8], b: &'a [u8]) -> Result<&'a [u8], FilterError> {
    Ok(if cmp(t, a, b)? == Ordering::Greater { b } else { a })
}

/// Типизированное сравнение двух тел элементов.
///
/// `None` — тела не сравнимы (несравнимый тип, NaN, короткое тело).
fn compare_bodies(t: PodType, a: &[u8], b: &[u8]) -> Option<Ordering> {
    let need = t.fixed_body_size()? as usize;
    if a.len() < need || b.len() < need {
        return None;
    }
    match t {
        PodType::Bool | PodType::Id => {
            Some(LittleEndian::read_u32(a).cmp(&LittleEndian::read_u32(b)))
        }
        PodType::Int => Some(LittleEndian::read_i32(a).cmp(&LittleEndian::read_i32(b))),
        PodType::Long => Some(LittleEndian::read_i64(a).cmp(&LittleEndian::read_i64(b))),
        PodType::Float => LittleEndian::read_f32(a).partial_cmp(&LittleEndian::read_f32(b)),
        PodType::Double => LittleEndian::read_f64(a).partial_cmp(&LittleEndian::read_f64(b)),
        PodType::Rectangle => {
            let (w1, h1) = (
                LittleEndian::read_u32(&a[..4]),
                LittleEndian::read_u32(&a[4..8]),
            );
            let (w2, h2) = (
                LittleEndian::read_u32(&b[..4]),
                LittleEndian::read_u32(&b[4..8]),
            );
            // Частичный порядок по обеим осям: прямоугольники, большие по
            // одной оси и меньшие по другой, несравнимы.
            if w1 == w2 && h1 == h2 {
                Some(Ordering::Equal)
            } else if w1 <= w2 && h1 <= h2 {
                Some(Ordering::Less)
            } else if w1 >= w2 && h1 >= h2 {
                Some(Ordering::Greater)
            } else {
                None
            }
        }
        PodType::Fraction => {
            // Сравнение дробей перекрёстным умножением, без потери точности.
            let (n1, d1) = (
                LittleEndian::read_u32(&a[..4]) as u64,
                LittleEndian::read_u32(&a[4..8]) as u64,
            );
            let (n2, d2) = (
                LittleEndian::read_u32(&b[..4]) as u64,
                LittleEndian::read_u32(&b[4..8]) as u64,
            );
            Some((n1 * d2).cmp(&(n2 * d1)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pod::types::Rectangle;

    fn build(f: impl FnOnce(&mut PodBuilder<'_>)) -> Vec<u8> {
        let mut buf = vec![0u8; 4096];
        let mut b = PodBuilder::new(&mut buf);
        f(&mut b);
        let n = b.finish().unwrap();
        buf.truncate(n);
        buf
    }

    fn int_choice(choice_type: ChoiceType, vals: &[i32]) -> Vec<u8> {
        build(|b| {
            b.open_choice(choice_type, 0).unwrap();
            for v in vals {
                b.write_int(*v).unwrap();
            }
            b.close().unwrap();
        })
    }

    fn run_filter(a: &[u8], b: &[u8]) -> Result<Vec<u8>, FilterError> {
        let pa = Pod::from_bytes(a).unwrap();
        let pb = Pod::from_bytes(b).unwrap();
        let mut buf = vec![0u8; 4096];
        let mut out = PodBuilder::new(&mut buf);
        filter_values(&pa, &pb, &mut out)?;
        let n = out.finish().unwrap();
        buf.truncate(n);
        Ok(buf)
    }

    fn choice_ints(data: &[u8]) -> (ChoiceType, Vec<i32>) {
        let v = Pod::from_bytes(data).unwrap().values().unwrap();
        let ints = v.elements().map(LittleEndian::read_i32).collect();
        (v.choice_type, ints)
    }

    #[test]
    fn test_enum_enum_intersection() {
        let a = int_choice(ChoiceType::Enum, &[44100, 48000, 96000]);
        let b = int_choice(ChoiceType::Enum, &[48000, 96000, 192000]);
        let out = run_filter(&a, &b).unwrap();
        let (ct, vals) = choice_ints(&out);
        assert_eq!(ct, ChoiceType::Enum);
        // Порядок первого операнда.
        assert_eq!(vals, vec![48000, 96000]);
    }

    #[test]
    fn test_enum_range_no_intersection() {
        // Частоты ниже минимума диапазона.
        let a = int_choice(ChoiceType::Enum, &[48000, 44100]);
        let b = int_choice(ChoiceType::Range, &[96000, 88200, 192000]);
        assert_eq!(run_filter(&a, &b).unwrap_err(), FilterError::NoIntersection);
        // И в обратную сторону тоже.
        assert_eq!(run_filter(&b, &a).unwrap_err(), FilterError::NoIntersection);
    }

    #[test]
    fn test_enum_range_keeps_values_inside() {
        let a = int_choice(ChoiceType::Enum, &[8000, 48000, 96000]);
        let b = int_choice(ChoiceType::Range, &[44100, 16000, 96000]);
        let out = run_filter(&a, &b).unwrap();
        let (ct, vals) = choice_ints(&out);
        assert_eq!(ct, ChoiceType::Enum);
        assert_eq!(vals, vec![48000, 96000]);
    }

    #[test]
    fn test_range_range_merge() {
        let a = int_choice(ChoiceType::Range, &[48000, 8000, 96000]);
        let b = int_choice(ChoiceType::Range, &[44100, 16000, 192000]);
        let out = run_filter(&a, &b).unwrap();
        let (ct, vals) = choice_ints(&out);
        assert_eq!(ct, ChoiceType::Range);
        assert_eq!(vals, vec![48000, 16000, 96000]);
    }

    #[test]
    fn test_range_range_empty() {
        let a = int_choice(ChoiceType::Range, &[1, 0, 10]);
        let b = int_choice(ChoiceType::Range, &[50, 20, 60]);
        assert_eq!(run_filter(&a, &b).unwrap_err(), FilterError::NoIntersection);
    }

    #[test]
    fn test_none_yields_other_side() {
        let bare = build(|b| b.write_int(48000).unwrap());
        let range = int_choice(ChoiceType::Range, &[44100, 8000, 96000]);
        let out = run_filter(&bare, &range).unwrap();
        let (ct, vals) = choice_ints(&out);
        assert_eq!(ct, ChoiceType::Range);
        assert_eq!(vals, vec![44100, 8000, 96000]);
    }

    #[test]
    fn test_both_none_equal_collapses() {
        let a = build(|b| b.write_int(42).unwrap());
        let out = run_filter(&a, &a.clone()).unwrap();
        let pod = Pod::from_bytes(&out).unwrap();
        // Свёрнуто до голого значения, не Choice.
        assert_eq!(pod.type_(), PodType::Int);
        assert_eq!(pod.as_int().unwrap(), 42);
    }

    #[test]
    fn test_both_none_unequal() {
        let a = build(|b| b.write_int(1).unwrap());
        let b = build(|b| b.write_int(2).unwrap());
        assert_eq!(run_filter(&a, &b).unwrap_err(), FilterError::NoIntersection);
    }

    #[test]
    fn test_step_flags_combination_fails() {
        let a = int_choice(ChoiceType::Step, &[10, 0, 100, 5]);
        let b = int_choice(ChoiceType::Flags, &[0b1, 0b10]);
        assert_eq!(run_filter(&a, &b).unwrap_err(), FilterError::NoIntersection);
    }

    #[test]
    fn test_commutative_modulo_order() {
        let a = int_choice(ChoiceType::Enum, &[1, 2, 3, 4]);
        let b = int_choice(ChoiceType::Enum, &[4, 3, 9]);
        let (ct1, mut v1) = choice_ints(&run_filter(&a, &b).unwrap());
        let (ct2, mut v2) = choice_ints(&run_filter(&b, &a).unwrap());
        v1.sort();
        v2.sort();
        assert_eq!(ct1, ct2);
        assert_eq!(v1, v2);
    }

    #[test]
    fn test_rectangle_range_filter() {
        let a = build(|b| {
            b.open_choice(ChoiceType::Range, 0).unwrap();
            for r in [
                Rectangle::new(320, 240),
                Rectangle::new(0, 0),
                Rectangle::new(1024, 1024),
            ] {
                b.write_rectangle(r).unwrap();
            }
            b.close().unwrap();
        });
        let b_ = build(|b| {
            b.open_choice(ChoiceType::Range, 0).unwrap();
            for r in [
                Rectangle::new(640, 480),
                Rectangle::new(160, 120),
                Rectangle::new(800, 600),
            ] {
                b.write_rectangle(r).unwrap();
            }
            b.close().unwrap();
        });
        let out = run_filter(&a, &b_).unwrap();
        let v = Pod::from_bytes(&out).unwrap().values().unwrap();
        assert_eq!(v.choice_type, ChoiceType::Range);
        assert_eq!(v.n_values, 3);
        // min = max(нижних границ), max = min(верхних).
        let min = v.element(1).unwrap();
        assert_eq!(LittleEndian::read_u32(&min[..4]), 160);
        let max = v.element(2).unwrap();
        assert_eq!(LittleEndian::read_u32(&max[..4]), 800);
    }

    #[test]
    fn test_rectangle_range_crosswise_merge() {
        // Границы, несравнимые как пары: шире-ниже против уже-выше.
        let a = build(|b| {
            b.open_choice(ChoiceType::Range, 0).unwrap();
            for r in [
                Rectangle::new(200, 150),
                Rectangle::new(100, 10),
                Rectangle::new(1000, 2000),
            ] {
                b.write_rectangle(r).unwrap();
            }
            b.close().unwrap();
        });
        let b_ = build(|b| {
            b.open_choice(ChoiceType::Range, 0).unwrap();
            for r in [
                Rectangle::new(150, 200),
                Rectangle::new(10, 100),
                Rectangle::new(2000, 1000),
            ] {
                b.write_rectangle(r).unwrap();
            }
            b.close().unwrap();
        });

        for (x, y) in [(&a, &b_), (&b_, &a)] {
            let out = run_filter(x, y).unwrap();
            let v = Pod::from_bytes(&out).unwrap().values().unwrap();
            assert_eq!(v.choice_type, ChoiceType::Range);
            let rect = |i: usize| {
                let e = v.element(i).unwrap();
                (
                    LittleEndian::read_u32(&e[..4]),
                    LittleEndian::read_u32(&e[4..8]),
                )
            };
            // Покомпонентно: максимум нижних, минимум верхних границ.
            assert_eq!(rect(0), (200, 200));
            assert_eq!(rect(1), (100, 100));
            assert_eq!(rect(2), (1000, 1000));
        }
    }

    #[test]
    fn test_rectangle_range_empty_on_one_axis() {
        let a = build(|b| {
            b.open_choice(ChoiceType::Range, 0).unwrap();
            for r in [
                Rectangle::new(100, 100),
                Rectangle::new(100, 100),
                Rectangle::new(200, 200),
            ] {
                b.write_rectangle(r).unwrap();
            }
            b.close().unwrap();
        });
        // По ширине диапазоны пересекаются, по высоте — нет.
        let b_ = build(|b| {
            b.open_choice(ChoiceType::Range, 0).unwrap();
            for r in [
                Rectangle::new(150, 300),
                Rectangle::new(100, 300),
                Rectangle::new(200, 400),
            ] {
                b.write_rectangle(r).unwrap();
            }
            b.close().unwrap();
        });
        assert_eq!(run_filter(&a, &b_).unwrap_err(), FilterError::NoIntersection);
    }

    #[test]
    fn test_rectangle_enum_in_range_componentwise() {
        let e = build(|b| {
            b.open_choice(ChoiceType::Enum, 0).unwrap();
            for r in [
                Rectangle::new(50, 50),
                Rectangle::new(150, 150),
                Rectangle::new(150, 50),
            ] {
                b.write_rectangle(r).unwrap();
            }
            b.close().unwrap();
        });
        let r = build(|b| {
            b.open_choice(ChoiceType::Range, 0).unwrap();
            for r in [
                Rectangle::new(100, 100),
                Rectangle::new(100, 100),
                Rectangle::new(200, 200),
            ] {
                b.write_rectangle(r).unwrap();
            }
            b.close().unwrap();
        });
        let out = run_filter(&e, &r).unwrap();
        let v = Pod::from_bytes(&out).unwrap().values().unwrap();
        assert_eq!(v.choice_type, ChoiceType::Enum);
        // (50,50) ниже диапазона, (150,50) мал по высоте; остаётся (150,150).
        assert_eq!(v.n_values, 1);
        let kept = v.element(0).unwrap();
        assert_eq!(LittleEndian::read_u32(&kept[..4]), 150);
        assert_eq!(LittleEndian::read_u32(&kept[4..8]), 150);
    }

    #[test]
    fn test_object_filter_shared_and_unique_keys() {
        let a = build(|b| {
            b.open_object(0x40002, 0).unwrap();
            b.open_property(1, 0).unwrap();
            b.open_choice(ChoiceType::Enum, 0).unwrap();
            b.write_int(10).unwrap();
            b.write_int(20).unwrap();
            b.close().unwrap();
            b.close().unwrap();
            b.open_property(2, 0).unwrap();
            b.write_int(7).unwrap();
            b.close().unwrap();
            b.close().unwrap();
        });
        let b_ = build(|b| {
            b.open_object(0x40002, 0).unwrap();
            b.open_property(1, 0).unwrap();
            b.open_choice(ChoiceType::Enum, 0).unwrap();
            b.write_int(20).unwrap();
            b.write_int(30).unwrap();
            b.close().unwrap();
            b.close().unwrap();
            b.open_property(3, 0).unwrap();
            b.write_int(8).unwrap();
            b.close().unwrap();
            b.close().unwrap();
        });

        let pa = Pod::from_bytes(&a).unwrap().as_object().unwrap();
        let pb = Pod::from_bytes(&b_).unwrap().as_object().unwrap();
        let mut buf = vec![0u8; 4096];
        let mut out = PodBuilder::new(&mut buf);
        filter_object(&pa, &pb, &mut out).unwrap();
        let n = out.finish().unwrap();

        let obj = Pod::from_bytes(&buf[..n]).unwrap().as_object().unwrap();
        // Общий ключ пересечён и свёрнут до единственного значения Enum.
        let shared = obj.find_prop(1).unwrap().unwrap();
        let v = shared.value.values().unwrap();
        assert_eq!(v.choice_type, ChoiceType::Enum);
        assert_eq!(v.n_values, 1);
        assert_eq!(LittleEndian::read_i32(v.element(0).unwrap()), 20);
        // Уникальные ключи скопированы с обеих сторон.
        assert_eq!(
            obj.find_prop(2).unwrap().unwrap().value.as_int().unwrap(),
            7
        );
        assert_eq!(
            obj.find_prop(3).unwrap().unwrap().value.as_int().unwrap(),
            8
        );
    }

    #[test]
    fn test_object_filter_type_mismatch() {
        let a = build(|b| {
            b.open_object(0x40001, 0).unwrap();
            b.close().unwrap();
        });
        let b_ = build(|b| {
            b.open_object(0x40002, 0).unwrap();
            b.close().unwrap();
        });
        let pa = Pod::from_bytes(&a).unwrap().as_object().unwrap();
        let pb = Pod::from_bytes(&b_).unwrap().as_object().unwrap();
        let mut buf = vec![0u8; 256];
        let mut out = PodBuilder::new(&mut buf);
        assert!(matches!(
            filter_object(&pa, &pb, &mut out),
            Err(FilterError::ObjectMismatch { .. })
        ));
    }
}
