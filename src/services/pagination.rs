//! 分页 - 业务能力层
//!
//! 对已经排好序的结果做固定大小的切片；排序由上游决定，这里只保持原顺序。

use serde::Serialize;

/// 一页结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSlice<T> {
    pub page_items: Vec<T>,
    /// 总页数，至少为 1
    pub total_pages: usize,
    pub total_count: usize,
    /// 请求的页码（从 1 开始，不做钳制）
    pub page: usize,
}

/// 总页数：`max(1, ceil(total / page_size))`
pub fn total_pages(total_count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    total_count.div_ceil(page_size).max(1)
}

/// 分页
///
/// # 参数
/// - `items`: 已排序的结果
/// - `page`: 页码（从 1 开始）；越界（包括 0）时返回空切片而不是报错
/// - `page_size`: 每页条数；为 0 时返回空切片
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> PageSlice<T> {
    let total_count = items.len();
    let total = total_pages(total_count, page_size);

    let page_items = if page == 0 || page_size == 0 {
        Vec::new()
    } else {
        let start = (page - 1).saturating_mul(page_size);
        if start >= total_count {
            Vec::new()
        } else {
            let end = start.saturating_add(page_size).min(total_count);
            items[start..end].to_vec()
        }
    };

    PageSlice {
        page_items,
        total_pages: total,
        total_count,
        page,
    }
}

/// 把页码钳制到 `[1, total_pages]`，供调用方在展示前使用
pub fn clamp_page(page: usize, total_count: usize, page_size: usize) -> usize {
    page.clamp(1, total_pages(total_count, page_size))
}
