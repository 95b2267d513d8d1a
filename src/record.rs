//! `DataRecord`: a decoded record's field values in template-declared order.

use crate::error::DecodeError;
use crate::field::{DecodeCtx, Field};
use crate::protocol::TemplateRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct DataRecord {
    pub fields: Vec<Field>,
}

impl DataRecord {
    /// Clones the template's field specifiers into fresh `Field`s and
    /// decodes each in turn (scope fields first for options templates),
    /// returning the record and the number of bytes consumed.
    pub fn decode(
        input: &[u8],
        template: &TemplateRecord,
        ctx: &DecodeCtx<'_>,
    ) -> Result<(DataRecord, usize), DecodeError> {
        let mut offset = 0;
        let mut fields = Vec::with_capacity(template.specifiers().len());
        for specifier in template.specifiers() {
            let mut field = specifier.builder.build(
                specifier.length,
                specifier.pen,
                specifier.reversed,
                ctx.observation_domain_id,
                specifier.is_scope,
            );
            let consumed = field.decode(&input[offset..], ctx)?;
            offset += consumed;
            fields.push(field);
        }
        Ok((DataRecord { fields }, offset))
    }

    pub fn encode(&self, out: &mut Vec<u8>) -> Result<usize, DecodeError> {
        let mut written = 0;
        for field in &self.fields {
            written += field.encode(out)?;
        }
        Ok(written)
    }

    pub fn get(&self, id: u16, pen: u32) -> Option<&Field> {
        self.fields.iter().find(|f| f.id() == id && f.pen() == pen)
    }
}
