//! S3 XML wire format for s3gate.
//!
//! Response documents implement [`S3Serialize`] and are rendered with [`to_xml`];
//! request documents implement [`S3Deserialize`] and are parsed with [`from_xml`].
//! Error responses use the flat `<Error>` document produced by [`error_to_xml`].
//!
//! # S3 XML conventions
//!
//! - Namespace: `http://s3.amazonaws.com/doc/2006-03-01/`
//! - Booleans: lowercase `true`/`false`
//! - Timestamps: ISO 8601 with milliseconds (`2006-02-03T16:45:09.000Z`)
//! - Every document starts with `<?xml version="1.0" encoding="UTF-8"?>`

pub mod deserialize;
pub mod error;
pub mod serialize;

pub use deserialize::{S3Deserialize, from_xml};
pub use error::{XmlError, error_to_xml, s3_error_to_xml};
pub use serialize::{S3_NAMESPACE, S3Serialize, to_xml};
