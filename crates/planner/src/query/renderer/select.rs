use crate::query::{
    ast::{
        common::{JoinKind, OrderDir, TableRef},
        select::{FromClause, FromSource, JoinClause, OrderByExpr, Select},
    },
    renderer::{Render, Renderer},
};

impl Render for Select {
    fn render(&self, r: &mut Renderer) {
        // 1. SELECT clause
        r.sql.push_str("select ");
        if self.columns.is_empty() {
            r.sql.push('*');
        } else {
            r.push_list(&self.columns, ", ");
        }

        // 2. FROM
        if let Some(from) = &self.from {
            r.sql.push(' ');
            from.render(r);
        }

        // 3. JOIN
        for join in &self.joins {
            r.sql.push(' ');
            join.render(r);
        }

        // 4. WHERE
        if let Some(where_clause) = &self.where_clause {
            r.sql.push_str(" where ");
            where_clause.render(r);
        }

        // 5. GROUP BY
        if !self.group_by.is_empty() {
            r.sql.push_str(" group by ");
            r.push_list(&self.group_by, ", ");
        }

        // 6. ORDER BY
        if !self.order_by.is_empty() {
            r.sql.push_str(" order by ");
            r.push_list(&self.order_by, ", ");
        }

        // 7. LIMIT
        if let Some(limit) = &self.limit {
            r.sql.push_str(" limit ");
            limit.render(r);
        }

        // 8. OFFSET
        if let Some(offset) = &self.offset {
            r.sql.push_str(" offset ");
            offset.render(r);
        }
    }
}

impl Render for TableRef {
    fn render(&self, r: &mut Renderer) {
        if let Some(schema) = &self.schema {
            r.push_quoted(schema);
            r.sql.push('.');
        }
        r.push_quoted(&self.name);
    }
}

impl Render for FromClause {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("from ");
        match &self.source {
            FromSource::Table(table) => table.render(r),
            FromSource::Subquery(select) => {
                r.sql.push('(');
                select.render(r);
                r.sql.push(')');
            }
        }
        if let Some(alias) = &self.alias {
            r.sql.push_str(" as ");
            r.push_quoted(alias);
        }
    }
}

impl Render for JoinClause {
    fn render(&self, r: &mut Renderer) {
        let join_str = match self.kind {
            JoinKind::Inner => "inner join",
            JoinKind::Left => "left join",
        };
        r.sql.push_str(&format!("{join_str} "));
        self.table.render(r);
        if let Some(alias) = &self.alias {
            r.sql.push_str(" as ");
            r.push_quoted(alias);
        }
        r.sql.push_str(" on ");
        self.on.render(r);
    }
}

impl Render for OrderByExpr {
    fn render(&self, r: &mut Renderer) {
        self.expr.render(r);
        if let Some(dir) = &self.direction {
            let dir_str = match dir {
                OrderDir::Asc => "asc",
                OrderDir::Desc => "desc",
            };
            r.sql.push(' ');
            r.sql.push_str(dir_str);
        }
    }
}
