//! Fixed-size pagination of an ordered sequence.

use serde::Serialize;
use thiserror::Error;

/// Asked for a page before the first or after the last.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no such page")]
pub struct NoPage;

#[derive(Debug, Clone)]
pub struct Paginator<T> {
    objects: Vec<T>,
    per_page: usize,
    base_path: String,
}

impl<T: Clone> Paginator<T> {
    /// `base_path` is the first page's path; later pages append `page-N`.
    /// A `per_page` of zero is treated as one.
    pub fn new(
        objects: impl IntoIterator<Item = T>,
        per_page: usize,
        base_path: impl Into<String>,
    ) -> Self {
        Self {
            objects: objects.into_iter().collect(),
            per_page: per_page.max(1),
            base_path: base_path.into(),
        }
    }

    pub fn count(&self) -> usize {
        self.objects.len()
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// Always at least one, even with nothing to paginate.
    pub fn num_pages(&self) -> usize {
        self.objects.len().div_ceil(self.per_page).max(1)
    }

    pub fn page_range(&self) -> std::ops::RangeInclusive<usize> {
        1..=self.num_pages()
    }

    pub fn page(&self, number: usize) -> Result<Page<T>, NoPage> {
        if number == 0 || number > self.num_pages() {
            return Err(NoPage);
        }
        let start = ((number - 1) * self.per_page).min(self.objects.len());
        let end = (start + self.per_page).min(self.objects.len());
        Ok(Page {
            object_list: self.objects[start..end].to_vec(),
            number,
            num_pages: self.num_pages(),
            per_page: self.per_page,
            base_path: self.base_path.clone(),
        })
    }

    pub fn pages(&self) -> Vec<Page<T>> {
        self.page_range()
            .filter_map(|number| self.page(number).ok())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: usize,
    num_pages: usize,
    per_page: usize,
    base_path: String,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }

    pub fn num_pages(&self) -> usize {
        self.num_pages
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_other_pages(&self) -> bool {
        self.has_next() || self.has_previous()
    }

    pub fn next_page_number(&self) -> Result<usize, NoPage> {
        if self.has_next() {
            Ok(self.number + 1)
        } else {
            Err(NoPage)
        }
    }

    pub fn previous_page_number(&self) -> Result<usize, NoPage> {
        if self.has_previous() {
            Ok(self.number - 1)
        } else {
            Err(NoPage)
        }
    }

    /// One-based position of the first object on this page.
    pub fn start_index(&self) -> usize {
        (self.number - 1) * self.per_page + 1
    }

    /// One-based position of the last slot on this page. Not clamped to the
    /// object count.
    pub fn end_index(&self) -> usize {
        self.number * self.per_page
    }

    pub fn path(&self) -> String {
        page_path(&self.base_path, self.number)
    }

    /// Navigation details for templates, without the objects themselves.
    pub fn summary(&self) -> PageSummary {
        PageSummary {
            number: self.number,
            num_pages: self.num_pages,
            has_next: self.has_next(),
            has_previous: self.has_previous(),
            has_other_pages: self.has_other_pages(),
            next_path: self
                .next_page_number()
                .ok()
                .map(|n| page_path(&self.base_path, n)),
            previous_path: self
                .previous_page_number()
                .ok()
                .map(|n| page_path(&self.base_path, n)),
            start_index: self.start_index(),
            end_index: self.end_index(),
            path: self.path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    pub number: usize,
    pub num_pages: usize,
    pub has_next: bool,
    pub has_previous: bool,
    pub has_other_pages: bool,
    pub next_path: Option<String>,
    pub previous_path: Option<String>,
    pub start_index: usize,
    pub end_index: usize,
    pub path: String,
}

fn page_path(base_path: &str, number: usize) -> String {
    if number > 1 {
        format!("{base_path}page-{number}")
    } else {
        base_path.to_string()
    }
}
