use comrak::options::Options;

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.superscript = true;
    ext.footnotes = true;
    ext.description_lists = true;
    ext.underline = true;
    ext.subscript = true;
    ext.cjk_friendly_emphasis = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.r#unsafe = true;
    render.sourcepos = false;
}
