use std::cell::{RefCell, RefMut};
use std::rc::Rc;

/// A persistent singly linked list whose tails are shared between clones.
///
/// Pushing onto a clone leaves the original untouched, while mutation through
/// `peek_mut` or `find_map` is visible to every list sharing that node.
#[derive(Debug)]
pub struct SharedList<T> {
    head: Link<T>,
}

type Link<T> = Option<Rc<RefCell<Node<T>>>>;

#[derive(Debug)]
struct Node<T> {
    elem: T,
    next: Link<T>,
}

impl<T> Node<T> {
    fn new(elem: T) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Node { elem, next: None }))
    }
}

impl<T> Clone for SharedList<T> {
    fn clone(&self) -> SharedList<T> {
        SharedList {
            head: self.head.as_ref().map(Rc::clone),
        }
    }
}

impl<T> SharedList<T> {
    pub fn new() -> Self {
        SharedList { head: None }
    }

    pub fn push(&mut self, elem: T) {
        let new_head = Node::new(elem);
        if let Some(old_head) = self.head.take() {
            new_head.borrow_mut().next = Some(old_head);
        }
        self.head = Some(new_head);
    }

    pub fn peek_mut(&mut self) -> Option<RefMut<T>> {
        self.head
            .as_ref()
            .map(|node| RefMut::map(node.borrow_mut(), |node| &mut node.elem))
    }

    #[cfg(test)]
    pub fn pop(&mut self) {
        if let Some(old_head) = self.head.take() {
            self.head = match Rc::try_unwrap(old_head) {
                Ok(node) => node.into_inner().next,
                Err(shared) => shared.borrow().next.clone(),
            };
        }
    }

    #[cfg(test)]
    pub fn tail(&self) -> SharedList<T> {
        SharedList {
            head: self
                .head
                .as_ref()
                .and_then(|old_head| old_head.borrow().next.clone()),
        }
    }

    #[cfg(test)]
    pub fn empty(&self) -> bool {
        self.head.is_none()
    }

    /// Visits elements from the head outward and returns the first `Some`.
    ///
    /// `f` receives each element mutably borrowed; it must not reach back into
    /// this list.
    pub fn find_map<R>(&self, mut f: impl FnMut(&mut T) -> Option<R>) -> Option<R> {
        let mut link = self.head.clone();
        while let Some(node) = link {
            if let Some(found) = f(&mut node.borrow_mut().elem) {
                return Some(found);
            }
            link = node.borrow().next.clone();
        }
        None
    }
}

impl<T> Drop for SharedList<T> {
    // Unlink iteratively so a long chain is not dropped recursively. Stops at
    // the first node another list still reaches; that list owns the rest.
    fn drop(&mut self) {
        while let Some(node) = self.head.take() {
            match Rc::try_unwrap(node) {
                Ok(node) => self.head = node.into_inner().next,
                Err(_) => break,
            }
        }
    }
}
