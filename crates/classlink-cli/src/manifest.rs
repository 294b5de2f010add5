//! JSON description of a class universe and the references to resolve in it.
use crate::CliError;
use classlink_types::{
    LoaderId,
    flags::{AccessFlags, ClassFlags},
    table::{ClassBuilder, ClassTable},
};
use serde::Deserialize;
use std::collections::HashMap;

pub const BOOTSTRAP_LOADER_NAME: &str = "bootstrap";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub loaders: Vec<LoaderSpec>,
    #[serde(default)]
    pub classes: Vec<ClassSpec>,
    #[serde(default)]
    pub resolve: Vec<Request>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderSpec {
    pub name: String,
    pub parent: Option<String>,
}

#[derive(Copy, Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    Array,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassSpec {
    pub name: String,
    pub loader: Option<String>,
    #[serde(default)]
    pub kind: ClassKind,
    #[serde(rename = "super")]
    pub super_name: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// Class flags; `public` and `super` are assumed when omitted.
    pub flags: Option<Vec<String>>,
    #[serde(default)]
    pub methods: Vec<MemberSpec>,
    #[serde(default)]
    pub fields: Vec<MemberSpec>,
    /// When set, the static initializer fails with this message.
    pub initializer_error: Option<String>,
    #[serde(default)]
    pub initializer: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberSpec {
    pub name: String,
    pub descriptor: String,
    #[serde(default)]
    pub flags: Vec<String>,
}

#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Static,
    Special,
    Virtual,
    Interface,
    Handle,
    GetStatic,
    PutStatic,
    GetField,
    PutField,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    pub kind: RequestKind,
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub caller: Option<String>,
    pub receiver: Option<String>,
    /// Loader that sees `caller` and `receiver`; bootstrap when omitted.
    pub loader: Option<String>,
}

/// Loader names as defined in a [`ClassTable`].
#[derive(Debug, Default)]
pub struct LoaderNames(HashMap<String, LoaderId>);

impl LoaderNames {
    pub fn get(&self, name: Option<&str>) -> Result<LoaderId, CliError> {
        match name {
            None | Some(BOOTSTRAP_LOADER_NAME) => Ok(LoaderId::BOOTSTRAP),
            Some(name) => self
                .0
                .get(name)
                .copied()
                .ok_or_else(|| CliError::UnknownLoader(name.to_string())),
        }
    }
}

pub fn parse_access_flags(flags: &[String]) -> Result<AccessFlags, CliError> {
    flags.iter().try_fold(AccessFlags::empty(), |acc, flag| {
        let bit = match flag.as_str() {
            "public" => AccessFlags::PUBLIC,
            "private" => AccessFlags::PRIVATE,
            "protected" => AccessFlags::PROTECTED,
            "static" => AccessFlags::STATIC,
            "final" => AccessFlags::FINAL,
            "synchronized" => AccessFlags::SYNCHRONIZED,
            "native" => AccessFlags::NATIVE,
            "abstract" => AccessFlags::ABSTRACT,
            other => return Err(CliError::UnknownFlag(other.to_string())),
        };
        Ok(acc | bit)
    })
}

pub fn parse_class_flags(flags: &[String]) -> Result<ClassFlags, CliError> {
    flags.iter().try_fold(ClassFlags::empty(), |acc, flag| {
        let bit = match flag.as_str() {
            "public" => ClassFlags::PUBLIC,
            "final" => ClassFlags::FINAL,
            "super" => ClassFlags::SUPER,
            "abstract" => ClassFlags::ABSTRACT,
            other => return Err(CliError::UnknownFlag(other.to_string())),
        };
        Ok(acc | bit)
    })
}

impl Manifest {
    pub fn from_json(text: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Define every loader and class, in manifest order.
    pub fn build(&self) -> Result<(ClassTable, LoaderNames), CliError> {
        let table = ClassTable::new()?;
        let mut loaders = LoaderNames::default();
        for spec in &self.loaders {
            let parent = loaders.get(spec.parent.as_deref())?;
            let id = table.define_loader(spec.name.clone(), parent)?;
            loaders.0.insert(spec.name.clone(), id);
        }

        for spec in &self.classes {
            let mut builder = match spec.kind {
                ClassKind::Class => ClassBuilder::class(&spec.name),
                ClassKind::Interface => ClassBuilder::interface(&spec.name),
                ClassKind::Array => ClassBuilder::array(&spec.name),
            };
            builder = builder.loader(loaders.get(spec.loader.as_deref())?);
            if let Some(flags) = &spec.flags {
                let mut flags = parse_class_flags(flags)?;
                if spec.kind == ClassKind::Interface {
                    flags |= ClassFlags::INTERFACE | ClassFlags::ABSTRACT;
                }
                builder = builder.flags(flags);
            }
            if let Some(super_name) = &spec.super_name {
                builder = builder.extends(super_name);
            }
            for iface in &spec.interfaces {
                builder = builder.implements(iface);
            }
            for method in &spec.methods {
                builder = builder.method(
                    &method.name,
                    &method.descriptor,
                    parse_access_flags(&method.flags)?,
                );
            }
            for field in &spec.fields {
                builder = builder.field(
                    &field.name,
                    &field.descriptor,
                    parse_access_flags(&field.flags)?,
                );
            }
            if let Some(message) = spec.initializer_error.clone() {
                builder = builder.initializer(move || Err(message.clone()));
            } else if spec.initializer {
                builder = builder.initializer(|| Ok(()));
            }
            table.define(builder)?;
        }
        Ok((table, loaders))
    }
}
