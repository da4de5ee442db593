use super::core::{CodeUsageRepository, SELECT_COLUMNS};
use crate::domain::code_usage::{
    ClassificationStats, CodeStats, CodeUsageEntry, CodeUsageFilter, CodeUsageQuery, PagedResult,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{escape_like, WhereBuilder};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension};

/// 单页最大条数
pub const MAX_PAGE_SIZE: i64 = 500;

/// 分页偏移量，溢出时返回 None
pub fn page_offset(page: i64, page_size: i64) -> Option<i64> {
    page.checked_sub(1)?.checked_mul(page_size)
}

impl CodeUsageRepository {
    // ==========================================
    // 单条查询
    // ==========================================

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<CodeUsageEntry>> {
        let conn = self.get_conn()?;
        Self::find_by_id_in(&conn, id)
    }

    /// 按完整编码查询（含软删除记录）
    pub fn find_by_model(&self, model: &str) -> RepositoryResult<Option<CodeUsageEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM code_usage_entry WHERE model = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![model], Self::map_row).optional()?)
    }

    /// 编码是否已被占用（含软删除记录）
    pub fn model_exists(&self, model: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        Self::model_exists_in(&conn, model)
    }

    // ==========================================
    // 列表查询
    // ==========================================

    /// 分页查询
    ///
    /// - page 从 1 开始，page_size 限制在 [1, MAX_PAGE_SIZE]
    /// - 默认排除软删除记录
    pub fn find_paged(&self, query: &CodeUsageQuery) -> RepositoryResult<PagedResult<CodeUsageEntry>> {
        let page = query.page.max(1);
        let page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);
        let offset = page_offset(page, page_size).ok_or_else(|| RepositoryError::FieldValueError {
            field: "page".to_string(),
            message: format!("页码超出范围: {}", page),
        })?;

        let mut wb = WhereBuilder::new();
        if let Some(mc_id) = query.model_classification_id {
            wb.push_with("model_classification_id = ?", vec![Value::Integer(mc_id)]);
        }
        if let Some(cc_id) = query.code_classification_id {
            wb.push_with("code_classification_id = ?", vec![Value::Integer(cc_id)]);
        }
        apply_filter(&mut wb, &query.filter);

        let conn = self.get_conn()?;

        let count_sql = format!("SELECT COUNT(*) FROM code_usage_entry{}", wb.clause());
        let total: i64 = conn.query_row(&count_sql, params_from_iter(wb.params().iter()), |row| row.get(0))?;

        let sql = format!(
            "SELECT {} FROM code_usage_entry{} ORDER BY model ASC LIMIT {} OFFSET {}",
            SELECT_COLUMNS,
            wb.clause(),
            page_size,
            offset
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(wb.params().iter()), Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(PagedResult {
            items,
            total,
            page,
            page_size,
        })
    }

    /// 按机型前缀查询
    pub fn find_by_model_type(
        &self,
        model_type: &str,
        filter: &CodeUsageFilter,
    ) -> RepositoryResult<Vec<CodeUsageEntry>> {
        let mut wb = WhereBuilder::new();
        wb.push_with("model_type = ?", vec![Value::Text(model_type.to_string())]);
        apply_filter(&mut wb, filter);
        self.find_where(&wb)
    }

    /// 按机型前缀 + 代码分类号查询
    pub fn find_by_model_type_and_number(
        &self,
        model_type: &str,
        classification_number: i32,
        filter: &CodeUsageFilter,
    ) -> RepositoryResult<Vec<CodeUsageEntry>> {
        let mut wb = WhereBuilder::new();
        wb.push_with("model_type = ?", vec![Value::Text(model_type.to_string())])
            .push_with(
                "code_classification_number = ?",
                vec![Value::Integer(classification_number as i64)],
            );
        apply_filter(&mut wb, filter);
        self.find_where(&wb)
    }

    fn find_where(&self, wb: &WhereBuilder) -> RepositoryResult<Vec<CodeUsageEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM code_usage_entry{} ORDER BY model ASC",
            SELECT_COLUMNS,
            wb.clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(wb.params().iter()), Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    // ==========================================
    // 统计
    // ==========================================

    pub fn stats(
        &self,
        model_classification_id: Option<i64>,
        code_classification_id: Option<i64>,
    ) -> RepositoryResult<CodeStats> {
        let conn = self.get_conn()?;
        Self::stats_in(&conn, model_classification_id, code_classification_id)
    }

    /// 按代码分类汇总剩余编码（含尚无记录的分类）
    pub fn stats_by_code_classification(
        &self,
        model_classification_id: i64,
    ) -> RepositoryResult<Vec<ClassificationStats>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT cc.id, cc.code, cc.name,
                   COUNT(e.id),
                   COALESCE(SUM(CASE WHEN e.is_allocated = 1 THEN 1 ELSE 0 END), 0)
            FROM code_classification cc
            LEFT JOIN code_usage_entry e
                   ON e.code_classification_id = cc.id AND e.is_deleted = 0
            WHERE cc.model_classification_id = ?1
            GROUP BY cc.id, cc.code, cc.name, cc.number
            ORDER BY cc.number ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![model_classification_id], |row| {
                let total: i64 = row.get(3)?;
                let allocated: i64 = row.get(4)?;
                Ok(ClassificationStats {
                    code_classification_id: row.get(0)?,
                    code: row.get(1)?,
                    name: row.get(2)?,
                    stats: CodeStats {
                        total,
                        allocated,
                        available: total - allocated,
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

/// 应用通用过滤条件
fn apply_filter(wb: &mut WhereBuilder, filter: &CodeUsageFilter) {
    if !filter.include_deleted {
        wb.push("is_deleted = 0");
    }
    if let Some(allocated) = filter.is_allocated {
        wb.push_with("is_allocated = ?", vec![Value::Integer(allocated as i64)]);
    }
    if let Some(t) = filter.occupancy_type {
        wb.push_with("occupancy_type = ?", vec![Value::Text(t.to_db_str().to_string())]);
    }
    if let Some(keyword) = filter
        .keyword
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
    {
        let pattern = format!("%{}%", escape_like(keyword));
        let cols = ["model", "product_name", "description", "builder", "requester"];
        let condition = format!(
            "({})",
            cols.iter()
                .map(|c| format!("{} LIKE ? ESCAPE '\\'", c))
                .collect::<Vec<_>>()
                .join(" OR ")
        );
        wb.push_with(
            &condition,
            cols.iter().map(|_| Value::Text(pattern.clone())).collect(),
        );
    }
}
