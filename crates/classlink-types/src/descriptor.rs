//! Structural field and method descriptors (`I`, `Ljava/lang/String;`, `(IJ)V`).
use crate::error::DescriptorError;
use std::fmt::{self, Display, Formatter, Write};

/// Canonical reference marker used when erasing signatures.
pub const ERASED_REFERENCE: &str = "Ljava/lang/Object;";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    Object(String),
    Array(Box<FieldType>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BasicType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Reference,
    Void,
}

impl FieldType {
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        let mut pos = 0;
        let parsed = Self::parse_at(descriptor, &mut pos)?;
        if pos != descriptor.len() {
            return Err(DescriptorError::TrailingCharacters(descriptor.to_string()));
        }
        Ok(parsed)
    }

    fn parse_at(descriptor: &str, pos: &mut usize) -> Result<Self, DescriptorError> {
        let bytes = descriptor.as_bytes();
        let Some(&tag) = bytes.get(*pos) else {
            return Err(DescriptorError::UnexpectedEnd(descriptor.to_string()));
        };
        *pos += 1;
        Ok(match tag {
            b'B' => FieldType::Byte,
            b'C' => FieldType::Char,
            b'D' => FieldType::Double,
            b'F' => FieldType::Float,
            b'I' => FieldType::Int,
            b'J' => FieldType::Long,
            b'S' => FieldType::Short,
            b'Z' => FieldType::Boolean,
            b'L' => {
                let start = *pos;
                let Some(len) = descriptor[start..].find(';') else {
                    return Err(DescriptorError::UnexpectedEnd(descriptor.to_string()));
                };
                if len == 0 {
                    return Err(DescriptorError::InvalidCharacter {
                        descriptor: descriptor.to_string(),
                        position: start,
                        found: ';',
                    });
                }
                *pos = start + len + 1;
                FieldType::Object(descriptor[start..start + len].to_string())
            }
            b'[' => FieldType::Array(Box::new(Self::parse_at(descriptor, pos)?)),
            b'V' => return Err(DescriptorError::VoidParameter(descriptor.to_string())),
            _ => {
                return Err(DescriptorError::InvalidCharacter {
                    descriptor: descriptor.to_string(),
                    position: *pos - 1,
                    found: descriptor
                        .get(*pos - 1..)
                        .and_then(|rest| rest.chars().next())
                        .unwrap_or('?'),
                });
            }
        })
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Object(_) | FieldType::Array(_))
    }

    pub fn basic_type(&self) -> BasicType {
        match self {
            FieldType::Byte => BasicType::Byte,
            FieldType::Char => BasicType::Char,
            FieldType::Double => BasicType::Double,
            FieldType::Float => BasicType::Float,
            FieldType::Int => BasicType::Int,
            FieldType::Long => BasicType::Long,
            FieldType::Short => BasicType::Short,
            FieldType::Boolean => BasicType::Boolean,
            FieldType::Object(_) | FieldType::Array(_) => BasicType::Reference,
        }
    }

    /// Class name this type refers to, looking through array dimensions.
    /// Primitive types and primitive arrays name no class.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            FieldType::Object(name) => Some(name),
            FieldType::Array(element) => element.class_name(),
            _ => None,
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Byte => f.write_char('B'),
            FieldType::Char => f.write_char('C'),
            FieldType::Double => f.write_char('D'),
            FieldType::Float => f.write_char('F'),
            FieldType::Int => f.write_char('I'),
            FieldType::Long => f.write_char('J'),
            FieldType::Short => f.write_char('S'),
            FieldType::Boolean => f.write_char('Z'),
            FieldType::Object(name) => write!(f, "L{};", name),
            FieldType::Array(element) => write!(f, "[{}", element),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReturnType {
    Void,
    Value(FieldType),
}

impl Display for ReturnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Void => f.write_char('V'),
            ReturnType::Value(t) => write!(f, "{}", t),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    pub return_type: ReturnType,
}

impl MethodDescriptor {
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        let bytes = descriptor.as_bytes();
        if bytes.first() != Some(&b'(') {
            return Err(DescriptorError::InvalidCharacter {
                descriptor: descriptor.to_string(),
                position: 0,
                found: descriptor.chars().next().unwrap_or('?'),
            });
        }

        let mut pos = 1;
        let mut parameters = vec![];
        loop {
            match bytes.get(pos) {
                None => return Err(DescriptorError::UnexpectedEnd(descriptor.to_string())),
                Some(b')') => {
                    pos += 1;
                    break;
                }
                Some(_) => parameters.push(FieldType::parse_at(descriptor, &mut pos)?),
            }
        }

        let return_type = match bytes.get(pos) {
            None => return Err(DescriptorError::UnexpectedEnd(descriptor.to_string())),
            Some(b'V') => {
                pos += 1;
                ReturnType::Void
            }
            Some(_) => ReturnType::Value(FieldType::parse_at(descriptor, &mut pos)?),
        };

        if pos != descriptor.len() {
            return Err(DescriptorError::TrailingCharacters(descriptor.to_string()));
        }

        Ok(Self {
            parameters,
            return_type,
        })
    }

    /// Erased form used to key signature-polymorphic intrinsics: every
    /// reference becomes [`ERASED_REFERENCE`] and primitives stay distinct.
    /// With `keep_last_arg`, the trailing parameter keeps its declared type.
    pub fn basic_signature(&self, keep_last_arg: bool) -> String {
        let mut out = String::from("(");
        let last = self.parameters.len().checked_sub(1);
        for (i, param) in self.parameters.iter().enumerate() {
            if param.is_reference() && !(keep_last_arg && Some(i) == last) {
                out.push_str(ERASED_REFERENCE);
            } else {
                let _ = write!(out, "{}", param);
            }
        }
        out.push(')');
        match &self.return_type {
            ReturnType::Value(t) if t.is_reference() => out.push_str(ERASED_REFERENCE),
            other => {
                let _ = write!(out, "{}", other);
            }
        }
        out
    }

    /// Class names mentioned by parameters and the return type, deduplicated
    /// in first-occurrence order.
    pub fn referenced_class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = vec![];
        let ret = match &self.return_type {
            ReturnType::Value(t) => Some(t),
            ReturnType::Void => None,
        };
        for name in self.parameters.iter().chain(ret).filter_map(FieldType::class_name) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

impl Display for MethodDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_char('(')?;
        for p in &self.parameters {
            write!(f, "{}", p)?;
        }
        write!(f, "){}", self.return_type)
    }
}

/// Class names referenced by either a method descriptor (leading `(`) or a
/// field descriptor.
pub fn referenced_class_names(descriptor: &str) -> Result<Vec<String>, DescriptorError> {
    if descriptor.starts_with('(') {
        let method = MethodDescriptor::parse(descriptor)?;
        Ok(method
            .referenced_class_names()
            .into_iter()
            .map(str::to_string)
            .collect())
    } else {
        let field = FieldType::parse(descriptor)?;
        Ok(field.class_name().map(str::to_string).into_iter().collect())
    }
}
