//! # Object Mapper
//!
//! Converts between a typed model instance and its flat attribute/row form.

use crate::{Attributes, Error, Model, Result, Row, analyze};

pub struct Mapper;

impl Mapper {
    /// Builds a `T` from a database row keyed by column name.
    ///
    /// Every value is first cast to its field kind; a column the
    /// specification does not map is an error.
    pub fn to_object<T: Model>(row: Row) -> Result<T> {
        let spec = analyze::<T>()?;
        let attributes = {
            let spec = spec.read();
            let field_to_attribute = spec.field_to_attribute_map();
            let field_kinds = spec.field_kinds();

            row.into_iter()
                .map(|(field, value)| {
                    let (Some(attribute), Some(kind)) = (field_to_attribute.get(&field), field_kinds.get(&field)) else {
                        return Err(Error::UnknownField { model: spec.name.clone(), field });
                    };
                    Ok((attribute.clone(), kind.coerce(value)?))
                })
                .collect::<Result<Attributes>>()?
        };

        T::from_attributes(attributes)
    }

    /// Reads every mapped attribute of `object`, skipping `excluded`.
    ///
    /// Keys are attribute names, not column names, so feeding the result back
    /// to [`Mapper::to_object`] only works when no column is renamed. Use
    /// [`Mapper::to_columns`] for that.
    pub fn to_row<T: Model>(object: &T, excluded: &[&str]) -> Result<Attributes> {
        let spec = analyze::<T>()?;
        let spec = spec.read();

        spec.mappings
            .iter()
            .filter(|m| !excluded.contains(&m.attr_name.as_str()))
            .map(|m| {
                object
                    .attribute(&m.attr_name)
                    .map(|value| (m.attr_name.clone(), value))
                    .ok_or_else(|| crate::model::unknown_attribute::<T>(&m.attr_name))
            })
            .collect()
    }

    /// Like [`Mapper::to_row`], keyed by column name.
    ///
    /// `to_object(to_columns(o))` gives back `o` for every mapped attribute.
    pub fn to_columns<T: Model>(object: &T, excluded: &[&str]) -> Result<Row> {
        let spec = analyze::<T>()?;
        let spec = spec.read();

        spec.mappings
            .iter()
            .filter(|m| !excluded.contains(&m.attr_name.as_str()))
            .map(|m| {
                object
                    .attribute(&m.attr_name)
                    .map(|value| (m.field_name.clone(), value))
                    .ok_or_else(|| crate::model::unknown_attribute::<T>(&m.attr_name))
            })
            .collect()
    }
}
