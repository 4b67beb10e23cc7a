use crate::query::{
    ast::expr::{BinaryOp, BinaryOperator, Expr, FunctionCall, Ident},
    renderer::{Render, Renderer},
};

impl Render for Expr {
    fn render(&self, r: &mut Renderer) {
        match self {
            Expr::Identifier(ident) => ident.render(r),
            Expr::Value(val) => r.add_param(val.clone()),
            Expr::BinaryOp(op) => op.render(r),
            Expr::FunctionCall(func) => func.render(r),
            Expr::Alias { expr, alias } => {
                expr.render(r);
                r.sql.push_str(" as ");
                r.push_quoted(alias);
            }
            Expr::JsonPath { column, path } => {
                let mut inner = Renderer::new(r.dialect);
                column.render(&mut inner);
                let sql = r.dialect.json_path(&inner.sql, path);
                r.sql.push_str(&sql);
            }
            Expr::And(exprs) => r.push_list(exprs, " and "),
            Expr::Or(exprs) => r.push_list(exprs, " or "),
            Expr::Not(expr) => {
                r.sql.push_str("not (");
                expr.render(r);
                r.sql.push(')');
            }
            Expr::Nested(expr) => {
                r.sql.push('(');
                expr.render(r);
                r.sql.push(')');
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                expr.render(r);
                r.sql.push_str(if *negated { " not in (" } else { " in (" });
                r.push_list(list, ", ");
                r.sql.push(')');
            }
            Expr::Between { expr, low, high } => {
                expr.render(r);
                r.sql.push_str(" between ");
                low.render(r);
                r.sql.push_str(" and ");
                high.render(r);
            }
            Expr::IsNull { expr, negated } => {
                expr.render(r);
                r.sql
                    .push_str(if *negated { " is not null" } else { " is null" });
            }
            Expr::Wildcard { qualifier } => {
                if let Some(qualifier) = qualifier {
                    r.push_quoted(qualifier);
                    r.sql.push('.');
                }
                r.sql.push('*');
            }
        }
    }
}

impl Render for Ident {
    fn render(&self, r: &mut Renderer) {
        if let Some(qualifier) = &self.qualifier {
            r.push_quoted(qualifier);
            r.sql.push('.');
        }
        r.push_quoted(&self.name);
    }
}

impl Render for BinaryOp {
    fn render(&self, r: &mut Renderer) {
        self.left.render(r);

        let ilike = r.dialect.supports_ilike();
        let op_str = match self.op {
            BinaryOperator::Eq => " = ",
            BinaryOperator::NotEq => " <> ",
            BinaryOperator::Lt => " < ",
            BinaryOperator::LtEq => " <= ",
            BinaryOperator::Gt => " > ",
            BinaryOperator::GtEq => " >= ",
            BinaryOperator::Like => " like ",
            BinaryOperator::NotLike => " not like ",
            BinaryOperator::ILike if ilike => " ilike ",
            BinaryOperator::ILike => " like ",
            BinaryOperator::NotILike if ilike => " not ilike ",
            BinaryOperator::NotILike => " not like ",
        };
        r.sql.push_str(op_str);

        self.right.render(r);
    }
}

impl Render for FunctionCall {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str(&self.name);
        r.sql.push('(');
        if self.wildcard {
            r.sql.push('*');
        } else {
            r.push_list(&self.args, ", ");
        }
        r.sql.push(')');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{
        dialect::{MySql, Postgres, Sqlite},
        ident, qualified,
        renderer::render,
        value,
    };
    use model::core::value::Value;

    #[test]
    fn test_binary_op_has_no_parens() {
        let expr = Expr::binary(ident("a"), BinaryOperator::Eq, value(Value::Int(5)));
        let (sql, params) = render(&expr, &Sqlite);
        assert_eq!(sql, r#""a" = ?"#);
        assert_eq!(params, vec![Value::Int(5)]);
    }

    #[test]
    fn test_groups_and_negation() {
        let a = Expr::binary(ident("a"), BinaryOperator::Gt, value(Value::Int(1)));
        let b = Expr::IsNull {
            expr: Box::new(ident("b")),
            negated: true,
        };
        let expr = Expr::Not(Box::new(
            Expr::Or(vec![a.nested(), b.nested()]).nested(),
        ));

        let (sql, _) = render(&expr, &Sqlite);
        assert_eq!(sql, r#"not ((("a" > ?) or ("b" is not null)))"#);
    }

    #[test]
    fn test_in_list_and_between_bind_in_order() {
        let expr = Expr::And(vec![
            Expr::InList {
                expr: Box::new(qualified("t", "a")),
                list: vec![value(Value::Int(1)), value(Value::Null)],
                negated: false,
            },
            Expr::Between {
                expr: Box::new(ident("b")),
                low: Box::new(value(Value::Int(2))),
                high: Box::new(value(Value::Int(3))),
            },
        ]);

        let (sql, params) = render(&expr, &Postgres);
        assert_eq!(sql, r#""t"."a" in ($1, $2) and "b" between $3 and $4"#);
        assert_eq!(
            params,
            vec![Value::Int(1), Value::Null, Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn test_ilike_degrades_without_native_support() {
        let expr = Expr::binary(
            ident("a"),
            BinaryOperator::NotILike,
            value(Value::String("%x%".into())),
        );
        assert_eq!(render(&expr, &Postgres).0, r#""a" not ilike $1"#);
        assert_eq!(render(&expr, &MySql).0, "`a` not like ?");
    }

    #[test]
    fn test_json_path_on_qualified_column() {
        let expr = Expr::JsonPath {
            column: Ident {
                qualifier: Some("user".into()),
                name: "address".into(),
            },
            path: vec!["city".into()],
        };
        assert_eq!(render(&expr, &Postgres).0, r#""user"."address"->>'city'"#);
    }
}
