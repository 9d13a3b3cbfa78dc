use std::cell::Cell;
use std::rc::Rc;

use filament_core::prelude::*;
use filament_dom::{Document, Event, NodeId};
use filament_html::*;

struct Todo {
    state: ObservableState,
    title: Observed<String>,
    done: Observed<bool>,
}

impl Observable for Todo {
    fn observable_state(&self) -> &ObservableState {
        &self.state
    }
}

impl Todo {
    const TITLE: Accessor<Todo, String> = accessor!(Todo, title: String);
    const DONE: Accessor<Todo, bool> = accessor!(Todo, done: bool, changed = |todo, _, done| {
        log::info!("{:?} is now {}", todo.title(), if *done { "done" } else { "open" });
    });

    fn new(title: &str) -> Rc<Self> {
        Rc::new(Self {
            state: ObservableState::new(),
            title: Observed::new(title.to_string()),
            done: Observed::new(false),
        })
    }

    fn title(&self) -> String {
        Self::TITLE.get(self)
    }

    fn done(&self) -> bool {
        Self::DONE.get(self)
    }

    fn toggle(&self) {
        Self::DONE.set(self, !self.done());
    }
}

struct TodoApp {
    todos: ObservableVec<Rc<Todo>>,
}

impl TodoApp {
    fn remaining(&self) -> usize {
        if self.todos.is_empty() {
            return 0;
        }
        self.todos
            .with(|todos| todos.iter().filter(|t| !t.done()).count())
    }
}

/// Runs update passes whenever the scheduler asks for a frame.
#[derive(Default)]
struct FrameLoop {
    requested: Cell<bool>,
}

impl FrameHost for FrameLoop {
    fn request_frame(&self) {
        self.requested.set(true);
    }
}

impl FrameLoop {
    fn run(&self) {
        while self.requested.replace(false) {
            process_updates();
        }
    }
}

fn row_template(doc: &Document) -> Result<ViewTemplate<Todo>, TemplateError> {
    html::<Todo>(doc)
        .markup("<li class=\"todo ")
        .bind(|t, _| t.done().then_some("done"))
        .markup("\"><input type=\"checkbox\" ?checked=\"")
        .bind(|t, _| t.done())
        .markup("\"><span>")
        .bind(|t, c| format!("{}. {}", c.index() + 1, t.title()))
        .markup("</span><button @click=\"")
        .bind(|t, _| t.toggle())
        .markup("\">toggle</button></li>")
        .build()
}

fn app_template(doc: &Document) -> Result<ViewTemplate<TodoApp>, TemplateError> {
    let row = row_template(doc)?;
    let empty = html::<TodoApp>(doc).markup("<p>Nothing to do</p>").build()?;
    html::<TodoApp>(doc)
        .markup("<h1>Todos (")
        .bind_volatile(|app, _| app.remaining())
        .markup(" left)</h1><ul>")
        .directive(repeat(|app: &TodoApp, _| app.todos.clone(), &row).positioning(true))
        .markup("</ul>")
        .directive(when(|app: &TodoApp, _| app.todos.is_empty(), &empty))
        .build()
}

fn buttons(doc: &Document, root: NodeId) -> Vec<NodeId> {
    let mut found = Vec::new();
    let mut cursor = doc.next_in_preorder(root, root);
    while let Some(node) = cursor {
        if doc.tag_name(node).as_deref() == Some("button") {
            found.push(node);
        }
        cursor = doc.next_in_preorder(root, node);
    }
    found
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let frames = Rc::new(FrameLoop::default());
    set_frame_host(frames.clone())?;

    let doc = Document::new();
    let template = app_template(&doc)?;
    let app = Rc::new(TodoApp {
        todos: ["write the parser", "diff the lists", "ship it"]
            .into_iter()
            .map(Todo::new)
            .collect(),
    });

    let root = doc.create_element("main");
    let _view = template.render(&app, root);
    println!("{}", doc.inner_html(root));

    if let Some(&first) = buttons(&doc, root).first() {
        doc.dispatch_event(first, &Rc::new(Event::new("click")));
    }
    app.todos.push(Todo::new("write the demo"));
    app.todos.remove(1);
    frames.run();
    println!("{}", doc.inner_html(root));

    app.todos.clear();
    frames.run();
    println!("{}", doc.inner_html(root));

    Ok(())
}
