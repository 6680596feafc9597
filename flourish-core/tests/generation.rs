//! Whole-site generation: every route written through a renderer, plus the
//! recipe and rescan entry points the CLI builds on.

mod common;

use flourish_core::{RenderError, Site};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Writes the template name and path, which is all these tests look at.
fn summary(template: &str, context: &JsonValue) -> Result<String, RenderError> {
    Ok(format!(
        "{template} {}",
        context["current_path"].as_str().unwrap_or_default()
    ))
}

fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative))
        .unwrap_or_else(|err| panic!("{relative}: {err}"))
}

#[test]
fn test_generate_site_writes_every_route() {
    let source = common::blog();
    let output = tempfile::tempdir().unwrap();
    let site = Site::open(source.path(), output.path().join("out")).unwrap();

    let generated = site.generate_site(&summary).unwrap();
    let out = site.output_dir();

    assert_eq!(read(out, "index.html"), "index.html /");
    assert_eq!(read(out, "page-2.html"), "index.html /page-2");
    assert_eq!(read(out, "page-3.html"), "index.html /page-3");
    assert_eq!(read(out, "basic-page.html"), "page.html /basic-page");
    assert_eq!(read(out, "markdown-page.html"), "article.html /markdown-page");
    assert_eq!(read(out, "series/part-one.html"), "page.html /series/part-one");
    assert_eq!(read(out, "tags/first/index.html"), "index.html /tags/first/");
    assert_eq!(
        read(out, "tags/first/thing-one.html"),
        "page.html /tags/first/thing-one"
    );
    assert_eq!(
        read(out, "2016/06/04/index.html"),
        "calendar_day.html /2016/06/04/"
    );
    assert_eq!(read(out, "about/index.html"), "about.html /about/");
    assert_eq!(read(out, "css/site.css"), "body { margin: 0; }\n");

    // sources, homepage pages, tags, tagged posts, years, months, days,
    // then the feed, the export and the about page
    assert_eq!(generated.len(), 6 + 3 + 4 + 6 + 2 + 3 + 4 + 1 + 1 + 1);
    assert!(generated
        .iter()
        .any(|g| g.route == "atom-feed" && g.path == "/index.atom"));
}

#[test]
fn test_generate_site_clears_stale_output() {
    let source = common::blog();
    let output = tempfile::tempdir().unwrap();
    common::write(output.path(), "stale.html", "old");
    let site = Site::open(source.path(), output.path()).unwrap();

    site.generate_site(&summary).unwrap();
    assert!(!output.path().join("stale.html").exists());
    assert!(output.path().join("index.html").exists());
}

#[test]
fn test_atom_feed() {
    let source = common::blog();
    let output = tempfile::tempdir().unwrap();
    let site = Site::open(source.path(), output.path()).unwrap();

    site.generate_route("atom-feed", &summary).unwrap();
    let feed = read(output.path(), "index.atom");

    assert!(feed.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(feed.contains("<id>http://localhost:8000/index.atom</id>"));
    assert!(feed.contains("<title>Flourish Test Site</title>"));
    assert!(feed.contains("<updated>2016-06-06T12:30:00Z</updated>"));
    assert_eq!(feed.matches("<entry>").count(), 5);

    // newest first
    let part = feed.find("http://localhost:8000/series/part-one").unwrap();
    let basic = feed.find("http://localhost:8000/basic-page").unwrap();
    assert!(part < basic);

    assert!(feed.contains("<name>Eric Cartman</name>"));
    assert!(feed.contains("<updated>2016-06-05T09:00:00Z</updated>"));
    assert!(feed.contains("&lt;p&gt;Basic.&lt;/p&gt;"));
    assert!(!feed.contains("/nothing"));
}

#[test]
fn test_csv_export() {
    let source = common::blog();
    let output = tempfile::tempdir().unwrap();
    let site = Site::open(source.path(), output.path()).unwrap();

    site.generate_route("export", &summary).unwrap();
    assert_eq!(
        read(output.path(), "index.csv"),
        "slug,title,published\n\
         basic-page,A basic page,2015-12-25T12:30:00Z\n\
         markdown-page,What is Markdown?,2016-02-29T12:30:00Z\n\
         nothing,Nothing,\n\
         thing-one,Thing one,2016-06-04T12:30:00Z\n\
         thing-two,Thing two,2016-06-04T12:30:00Z\n\
         series/part-one,Part one,2016-06-06T12:30:00Z\n"
    );
}

#[test]
fn test_generate_path_writes_only_matches() {
    let source = common::blog();
    let output = tempfile::tempdir().unwrap();
    let site = Site::open(source.path(), output.path()).unwrap();

    let generated = site.generate_path("/2016/?", &summary).unwrap();
    let mut paths: Vec<&str> = generated.iter().map(|g| g.path.as_str()).collect();
    paths.sort_unstable();
    assert_eq!(
        paths,
        vec![
            "/2016/",
            "/2016/02/",
            "/2016/02/29/",
            "/2016/06/",
            "/2016/06/04/",
            "/2016/06/06/",
        ]
    );
    assert!(!output.path().join("index.html").exists());

    let generated = site.generate_path("/page-2", &summary).unwrap();
    assert_eq!(generated.len(), 1);
    assert_eq!(read(output.path(), "page-2.html"), "index.html /page-2");

    assert!(site.generate_path("/nowhere", &summary).unwrap().is_empty());
}

#[test]
fn test_recipe_for_document_page() {
    let source = common::blog();
    let output = tempfile::tempdir().unwrap();
    let site = Site::open(source.path(), output.path()).unwrap();

    let recipe = site.recipe("/basic-page").unwrap().unwrap();
    assert_eq!(recipe.path, "/basic-page");
    assert_eq!(recipe.template_name.as_deref(), Some("page.html"));
    assert_eq!(recipe.context["title"], "A basic page");
    assert_eq!(recipe.context["page"]["path"], "/basic-page");
    assert_eq!(
        recipe.context["page"]["absolute_path"],
        "http://localhost:8000/basic-page"
    );
    assert_eq!(recipe.context["site"]["title"], "Flourish Test Site");
    assert_eq!(recipe.context["tokens"]["slug"], "basic-page");

    let article = site.recipe("/markdown-page").unwrap().unwrap();
    assert_eq!(article.template_name.as_deref(), Some("article.html"));

    assert!(site.recipe("/nowhere").unwrap().is_none());
}

#[test]
fn test_recipe_for_listings() {
    let source = common::blog();
    let output = tempfile::tempdir().unwrap();
    let site = Site::open(source.path(), output.path())
        .unwrap()
        .with_global_context(|site| serde_json::json!({ "documents": site.store().len() }));

    let second = site.recipe("/page-2").unwrap().unwrap();
    assert_eq!(second.context["current_page"]["number"], 2);
    assert_eq!(second.context["current_page"]["previous_path"], "/");
    assert_eq!(second.context["pagination"]["num_pages"], 3);
    assert_eq!(second.context["pages"].as_array().unwrap().len(), 2);
    assert_eq!(second.context["global"]["documents"], 6);

    let year = site.recipe("/2016/").unwrap().unwrap();
    assert_eq!(year.template_name.as_deref(), Some("calendar_year.html"));
    assert_eq!(year.context["year"], "2016-01-01");
    assert_eq!(year.context["publication_dates"][1]["month"], "2016-06-01");

    let about = site.recipe("/about/").unwrap().unwrap();
    assert_eq!(about.template_name.as_deref(), Some("about.html"));
    assert_eq!(about.context["heading"], "About this site");
    assert_eq!(about.context["sources"], serde_json::json!([]));
}

#[test]
fn test_future_documents_are_excluded_on_request() {
    let source = common::blog();
    common::write(
        source.path(),
        "coming-soon.toml",
        "title = \"Coming soon\"\npublished = 2999-01-01T00:00:00Z\n",
    );
    let output = tempfile::tempdir().unwrap();

    let site = Site::open(source.path(), output.path()).unwrap();
    assert!(site.includes_future());
    assert!(site.handlers_for_path("/2999/").len() == 1);

    let site = site.with_future(Some(false));
    assert!(site.handlers_for_path("/2999/").is_empty());
    assert!(site.recipe("/coming-soon").unwrap().is_none());
    // still reachable by slug
    assert!(site.get("coming-soon").is_ok());
}

#[test]
fn test_future_setting_from_site_config() {
    let source = common::blog();
    common::write(
        source.path(),
        "_site.toml",
        &format!("{}future = false\n", common::SITE_TOML),
    );
    let output = tempfile::tempdir().unwrap();

    let site = Site::open(source.path(), output.path()).unwrap();
    assert!(!site.includes_future());
    assert!(site.with_future(Some(true)).includes_future());
}

#[test]
fn test_rescan_keeps_unchanged_documents() {
    let source = common::blog();
    let output = tempfile::tempdir().unwrap();
    let mut site = Site::open(source.path(), output.path()).unwrap();
    let basic = site.get("basic-page").unwrap();
    let thing = site.get("thing-two").unwrap();

    common::write(
        source.path(),
        "thing-two.toml",
        "title = \"Thing two, revised\"\npublished = 2016-06-04T12:30:00Z\n",
    );
    fs::File::options()
        .write(true)
        .open(source.path().join("thing-two.toml"))
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(60))
        .unwrap();
    fs::remove_file(source.path().join("nothing.toml")).unwrap();

    let scan = site.rescan().unwrap();
    assert_eq!(scan.changed, 1);
    assert_eq!(scan.removed, 1);
    assert_eq!(scan.retained, 4);

    assert!(Arc::ptr_eq(&basic, &site.get("basic-page").unwrap()));
    let revised = site.get("thing-two").unwrap();
    assert!(!Arc::ptr_eq(&thing, &revised));
    assert_eq!(revised.str("title"), Some("Thing two, revised"));
    assert!(site.get("nothing").is_err());

    // an unchanged tree is a no-op
    let again = site.rescan().unwrap();
    assert_eq!(again.retained, 5);
    assert_eq!(again.changed + again.added + again.removed, 0);
}

#[test]
fn test_lookup_reports_missing_documents() {
    let source = common::blog();
    let output = tempfile::tempdir().unwrap();
    let site = Site::open(source.path(), output.path()).unwrap();

    assert!(site.lookup("thing-one").is_some());
    assert!(site.lookup("thing-three").is_none());
    let missing = site.diagnostics().with_code("lookup.missing");
    assert_eq!(missing.len(), 1);
    assert!(missing[0].message.contains("thing-three"));
}
