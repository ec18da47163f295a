//! Translation from store filter expressions to MongoDB query documents.

use bson::{Bson, Document, doc};

use shopdesk_store::{
    error::DocumentStoreError,
    query::{Expr, FieldOp, QueryVisitor},
};

/// Escapes regex metacharacters so user input is matched literally.
pub(crate) fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());

    for ch in input.chars() {
        if "\\^$.|?*+()[]{}/-".contains(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    escaped
}

fn regex(pattern: String) -> Document {
    doc! { "$regex": pattern, "$options": "i" }
}

/// Builds MongoDB filter documents by walking an [`Expr`].
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    pub(crate) fn translate(expr: Option<&Expr>) -> Result<Document, DocumentStoreError> {
        match expr {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            // `$or` rejects an empty array; an empty disjunction matches nothing.
            return Ok(doc! { "_id": { "$exists": false } });
        }

        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let condition = match op {
            FieldOp::Eq => doc! { "$eq": value },
            FieldOp::Ne => doc! { "$ne": value },
            FieldOp::Gt => doc! { "$gt": value },
            FieldOp::Gte => doc! { "$gte": value },
            FieldOp::Lt => doc! { "$lt": value },
            FieldOp::Lte => doc! { "$lte": value },
            FieldOp::Contains => match value {
                Bson::String(s) => regex(escape_regex(s)),
                Bson::Array(arr) => doc! { "$all": arr },
                other => doc! { "$elemMatch": { "$eq": other } },
            },
            FieldOp::AnyOf => match value {
                Bson::Array(_) => doc! { "$in": value },
                single => doc! { "$in": [single] },
            },
            FieldOp::NoneOf => match value {
                Bson::Array(_) => doc! { "$nin": value },
                single => doc! { "$nin": [single] },
            },
        };

        Ok(doc! { field: condition })
    }
}

#[cfg(test)]
mod tests {
    use shopdesk_store::query::Filter;

    use super::*;

    #[test]
    fn contains_is_a_literal_case_insensitive_regex() {
        let filter = MongoQueryTranslator::translate(Some(&Filter::contains("name", "a.b(c)"))).unwrap();

        assert_eq!(
            filter,
            doc! { "name": { "$regex": "a\\.b\\(c\\)", "$options": "i" } }
        );
    }

    #[test]
    fn search_becomes_or_of_regexes() {
        let filter =
            MongoQueryTranslator::translate(Some(&Filter::search(["name", "brand"], "lg"))).unwrap();

        assert_eq!(
            filter,
            doc! {
                "$or": [
                    { "name": { "$regex": "lg", "$options": "i" } },
                    { "brand": { "$regex": "lg", "$options": "i" } },
                ]
            }
        );
    }

    #[test]
    fn negation_uses_nor() {
        let filter = MongoQueryTranslator::translate(Some(&Filter::eq("status", "pending").not())).unwrap();

        assert_eq!(filter, doc! { "$nor": [{ "status": { "$eq": "pending" } }] });
    }

    #[test]
    fn missing_filter_matches_everything() {
        assert_eq!(MongoQueryTranslator::translate(None).unwrap(), doc! {});
    }
}
