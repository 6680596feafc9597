//! A small blog used by the integration tests.

use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const SITE_TOML: &str = r#"
author = "Wendy Testaburger"
title = "Flourish Test Site"
base_url = "http://localhost:8000/"
"#;

pub const GENERATE_TOML: &str = r#"
[[paths]]
name = "source"
pattern = "/#slug"
kind = "page"

[[paths]]
name = "homepage"
pattern = "/"
kind = "paginated"
per_page = 2
order_by = ["-published"]
filter = { published__set = "" }

[[paths]]
name = "tags-tag-page"
pattern = "/tags/#tag/"
kind = "index"
order_by = ["published"]

[[paths]]
name = "tag-post"
pattern = "/tags/#tag/#slug"
kind = "page"

[[paths]]
name = "year-index"
pattern = "/#year/"
kind = "calendar_year"

[[paths]]
name = "month-index"
pattern = "/#year/#month/"
kind = "calendar_month"

[[paths]]
name = "day-index"
pattern = "/#year/#month/#day/"
kind = "calendar_day"

[[paths]]
name = "atom-feed"
pattern = "/index.atom"
kind = "atom"

[[paths]]
name = "export"
pattern = "/index.csv"
kind = "csv"
fields = ["slug", "title", "published"]

[[paths]]
name = "about"
pattern = "/about/"
kind = "static"
template = "about.html"
context = { heading = "About this site" }
"#;

pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Source directory with six documents, five of them published on
/// 2015-12-25, 2016-02-29, 2016-06-04 (twice) and 2016-06-06.
pub fn blog() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "_site.toml", SITE_TOML);
    write(root, "generate.toml", GENERATE_TOML);
    write(
        root,
        "basic-page.toml",
        r#"
title = "A basic page"
published = 2015-12-25T12:30:00Z
tag = ["basic-page", "basic"]
body = "<p>Basic.</p>"
"#,
    );
    write(
        root,
        "markdown-page.markdown",
        r#"---
title = "What is Markdown?"
published = 2016-02-29T12:30:00Z
tag = ["basic"]
page_type = "article"
---
Markdown is *easy*.
"#,
    );
    write(root, "nothing.toml", "title = \"Nothing\"\n");
    write(
        root,
        "thing-one.toml",
        r#"
title = "Thing one"
published = 2016-06-04T12:30:00Z
tag = ["first"]
"#,
    );
    write(
        root,
        "thing-two.toml",
        r#"
title = "Thing two"
published = 2016-06-04T12:30:00Z
updated = 2016-06-05T09:00:00Z
author = "Eric Cartman"
"#,
    );
    write(
        root,
        "series/part-one.toml",
        r#"
title = "Part one"
published = 2016-06-06T12:30:00Z
tag = ["series", "first"]
"#,
    );
    write(root, "css/site.css", "body { margin: 0; }\n");
    dir
}
