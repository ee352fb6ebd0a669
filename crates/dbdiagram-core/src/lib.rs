//! Database Diagram Core Types and Definitions
//!
//! This crate provides the foundational types shared by the database diagram
//! renderer. It includes:
//!
//! - **Geometry**: Measured boxes and padding ([`geometry`] module)
//! - **Attributes**: Typed attribute bags applied to graphic elements ([`attributes`] module)
//! - **CSS**: Declaration list and `:root` rule parsing ([`css`] module)
//! - **DOM**: An owned element tree ([`dom`] module)
//! - **Fields**: Table field model used to select fonts and icons ([`field`] module)
//! - **Assets**: Icon and style name registries ([`assets`] module)

pub mod assets;
pub mod attributes;
pub mod css;
pub mod dom;
pub mod field;
pub mod geometry;
