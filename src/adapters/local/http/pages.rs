use crate::adapters::local::workspace::OutputFile;

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Upload form plus the current output listing.
pub fn index(files: &[OutputFile]) -> String {
    let file_list = if files.is_empty() {
        "<li>No files yet.</li>".to_string()
    } else {
        files
            .iter()
            .map(|file| {
                format!(
                    r#"<li><a href="/output/{}">{}</a> ({})</li>"#,
                    urlencoding::encode(&file.name),
                    escape_html(&file.name),
                    human_size(file.size)
                )
            })
            .collect::<String>()
    };

    format!(
        r#"<!doctype html>
<html>
    <head>
        <title>Video splitter</title>
    </head>
    <body>
        <h1>Split a video</h1>
        <form action="/split" method="post" enctype="multipart/form-data">
            <div>
                <label>
                    Video file:
                    <input type="file" name="video" accept="video/*" required>
                </label>
            </div>
            <div>
                <label>
                    Segment duration (seconds):
                    <input type="number" name="duration" min="1" value="60" required>
                </label>
            </div>
            <div>
                <input type="submit" value="Split">
            </div>
        </form>
        <form action="/clear" method="post">
            <input type="submit" value="Clear files">
        </form>
        <h2>Output files</h2>
        <ul>{}</ul>
    </body>
</html>
"#,
        file_list
    )
}
