use crate::proverb::Proverb;
use crate::ui::{theme, Icons};
use owo_colors::{OwoColorize, Style};

/// Apply `style` only when the theme is colored
fn paint(text: &str, style: &Style) -> String {
    if theme().colored {
        text.style(style.clone()).to_string()
    } else {
        text.to_string()
    }
}

pub fn header(text: &str) {
    println!("{} {}", Icons::STATS, paint(text, &theme().header));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, paint(label, &theme().success));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, paint(label, &theme().error));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, paint(label, &theme().warn));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        paint(Icons::INFO, &theme().info),
        paint(label, &theme().dim),
        value
    );
}

pub fn timing(elapsed: &str) {
    eprintln!("{} {}", paint(Icons::CLOCK, &theme().dim), elapsed);
}

pub fn dim(text: &str) -> String {
    paint(text, &theme().dim)
}

/// `<text>  [tag1, tag2]`, with the tag list styled when colored
pub fn proverb_line(proverb: &Proverb) -> String {
    let tags: Vec<String> = proverb.tags.iter().map(|t| paint(t, &theme().tag)).collect();
    format!("{}  [{}]", proverb.text, tags.join(", "))
}

/// One line per proverb on stdout. Nothing is printed for an empty result.
pub fn proverbs(list: &[Proverb]) {
    for proverb in list {
        println!("{}", proverb_line(proverb));
    }
}
