//! Ordered multi-map over `(score, member)` pairs backed by a skip list.
//!
//! The layout follows Pugh's scheme with two amendments: entries may share a
//! score (ties break on the member bytes), and layer 0 carries a backward
//! pointer so range endpoints can settle onto the exact qualifying node by
//! walking in either direction.

use crate::range::RangeSpec;
use crate::token::Token;
use rand::Rng;
use std::cmp::Ordering;
use std::marker::PhantomData;
use std::mem::size_of;
use std::ptr;

pub const MAX_LEVEL: usize = 32;
/// Probability that a node present on layer `n` also reaches layer `n + 1`.
const P: f64 = 0.25;

type Link = *mut Node;

struct Node {
    // Payload is absent only on the header node.
    score: Option<Token>,
    member: Option<Token>,
    // One slot per layer, sized at creation and never resized.
    forward: Box<[Link]>,
    // Layer-0 only; null when the predecessor is the header.
    backward: Link,
}

impl Node {
    fn alloc(level: usize, score: Token, member: Token) -> Link {
        Box::into_raw(Box::new(Node {
            score: Some(score),
            member: Some(member),
            forward: vec![ptr::null_mut(); level].into_boxed_slice(),
            backward: ptr::null_mut(),
        }))
    }

    fn head() -> Link {
        Box::into_raw(Box::new(Node {
            score: None,
            member: None,
            forward: vec![ptr::null_mut(); MAX_LEVEL].into_boxed_slice(),
            backward: ptr::null_mut(),
        }))
    }

    fn entry(&self) -> (&Token, &Token) {
        match (&self.score, &self.member) {
            (Some(s), Some(m)) => (s, m),
            _ => unreachable!("header node carries no payload"),
        }
    }
}

/// Draw a level in `[1, MAX_LEVEL]` with a geometric distribution: each
/// 16-bit draw below `P * 0xFFFF` adds a layer.
fn random_level<R: Rng>(rng: &mut R) -> usize {
    let mut level = 1;
    while f64::from(rng.gen::<u16>()) < P * f64::from(u16::MAX) && level < MAX_LEVEL {
        level += 1;
    }
    level
}

pub struct SkipList {
    header: Link,
    // Rightmost layer-0 node; null exactly when the list is empty.
    tail: Link,
    level: usize,
    length: usize,
}

// The node graph is reached only through &self / &mut self and tokens are
// atomically refcounted, so moving the list across threads is sound.
unsafe impl Send for SkipList {}

impl Default for SkipList {
    fn default() -> Self {
        Self::new()
    }
}

impl SkipList {
    pub fn new() -> Self {
        SkipList {
            header: Node::head(),
            tail: ptr::null_mut(),
            level: 1,
            length: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Insert an entry. Duplicate `(score, member)` pairs are not detected
    /// here; callers that want replace-on-duplicate go through [`upsert`].
    ///
    /// [`upsert`]: SkipList::upsert
    pub fn insert(&mut self, score: Token, member: Token) {
        let mut update: [Link; MAX_LEVEL] = [ptr::null_mut(); MAX_LEVEL];
        unsafe {
            let mut x = self.header;
            for i in (0..self.level).rev() {
                loop {
                    let next = (*x).forward[i];
                    if next.is_null() {
                        break;
                    }
                    let cmp = Token::cmp_opt((*next).score.as_ref(), Some(&score));
                    let before = cmp == Ordering::Less
                        || (cmp == Ordering::Equal
                            && (*next)
                                .member
                                .as_ref()
                                .is_some_and(|m| m.cmp_bytes(&member) == Ordering::Less));
                    if before {
                        x = next;
                    } else {
                        break;
                    }
                }
                update[i] = x;
            }

            let level = random_level(&mut rand::thread_rng());
            if level > self.level {
                for slot in update.iter_mut().take(level).skip(self.level) {
                    *slot = self.header;
                }
                self.level = level;
            }

            let x = Node::alloc(level, score, member);
            for i in 0..level {
                (*x).forward[i] = (*update[i]).forward[i];
                (*update[i]).forward[i] = x;
            }

            (*x).backward = if update[0] == self.header {
                ptr::null_mut()
            } else {
                update[0]
            };
            let succ = (*x).forward[0];
            if !succ.is_null() {
                (*succ).backward = x;
            } else {
                self.tail = x;
            }
            self.length += 1;
        }
    }

    /// Replace-on-duplicate insert. Returns `true` when the entry is net-new,
    /// `false` when an identical pair was displaced first.
    pub fn upsert(&mut self, score: Token, member: Token) -> bool {
        let existed = self.delete(&score, &member);
        self.insert(score, member);
        !existed
    }

    /// Remove the entry matching both the score (score order) and the exact
    /// member bytes. Returns whether an entry was removed.
    pub fn delete(&mut self, score: &Token, member: &Token) -> bool {
        let mut update: [Link; MAX_LEVEL] = [ptr::null_mut(); MAX_LEVEL];
        unsafe {
            let mut x = self.header;
            for i in (0..self.level).rev() {
                loop {
                    let next = (*x).forward[i];
                    if next.is_null() {
                        break;
                    }
                    let cmp = Token::cmp_opt((*next).score.as_ref(), Some(score));
                    let before = cmp == Ordering::Less
                        || (cmp == Ordering::Equal
                            && (*next)
                                .member
                                .as_ref()
                                .is_some_and(|m| m.cmp_bytes(member) == Ordering::Less));
                    if before {
                        x = next;
                    } else {
                        break;
                    }
                }
                update[i] = x;
            }

            // Equal scores may run long; only the node carrying the exact
            // member is a match.
            let x = (*update[0]).forward[0];
            if x.is_null() {
                return false;
            }
            let matches = Token::cmp_opt((*x).score.as_ref(), Some(score)) == Ordering::Equal
                && (*x)
                    .member
                    .as_ref()
                    .is_some_and(|m| m.cmp_bytes(member) == Ordering::Equal);
            if matches {
                self.unlink(x, &update);
                drop(Box::from_raw(x));
                true
            } else {
                false
            }
        }
    }

    /// Remove every entry whose score equals `score`, returning the count.
    pub fn delete_score(&mut self, score: &Token) -> usize {
        let mut update: [Link; MAX_LEVEL] = [ptr::null_mut(); MAX_LEVEL];
        unsafe {
            let mut x = self.header;
            for i in (0..self.level).rev() {
                loop {
                    let next = (*x).forward[i];
                    if next.is_null()
                        || Token::cmp_opt((*next).score.as_ref(), Some(score)) != Ordering::Less
                    {
                        break;
                    }
                    x = next;
                }
                update[i] = x;
            }

            let mut x = (*update[0]).forward[0];
            let mut deleted = 0;
            while !x.is_null() && Token::cmp_opt((*x).score.as_ref(), Some(score)) == Ordering::Equal
            {
                let next = (*x).forward[0];
                self.unlink(x, &update);
                drop(Box::from_raw(x));
                deleted += 1;
                x = next;
            }
            deleted
        }
    }

    /// Detach `x` at every layer where it is the immediate forward of the
    /// recorded predecessor, then repair the backward thread, tail, level,
    /// and length.
    unsafe fn unlink(&mut self, x: Link, update: &[Link; MAX_LEVEL]) {
        for i in 0..self.level {
            if (*update[i]).forward[i] == x {
                (*update[i]).forward[i] = (*x).forward[i];
            }
        }
        let succ = (*x).forward[0];
        if !succ.is_null() {
            (*succ).backward = (*x).backward;
        } else {
            self.tail = (*x).backward;
        }
        while self.level > 1 && (*self.header).forward[self.level - 1].is_null() {
            self.level -= 1;
        }
        self.length -= 1;
    }

    /// Leftmost node whose score equals `score`, or null.
    fn search_smallest_node(&self, score: &Token) -> Link {
        unsafe {
            let mut x = self.header;
            for i in (0..self.level).rev() {
                loop {
                    let next = (*x).forward[i];
                    if next.is_null() {
                        break;
                    }
                    match Token::cmp_opt((*next).score.as_ref(), Some(score)) {
                        Ordering::Less => x = next,
                        Ordering::Equal => {
                            // A higher layer can land mid-run; settle onto the
                            // first equal node along the backward thread.
                            let mut x = next;
                            while !(*x).backward.is_null()
                                && Token::cmp_opt((*(*x).backward).score.as_ref(), Some(score))
                                    == Ordering::Equal
                            {
                                x = (*x).backward;
                            }
                            return x;
                        }
                        Ordering::Greater => break,
                    }
                }
            }
            ptr::null_mut()
        }
    }

    /// Iterate the entries whose score equals `score`, leftmost first, in
    /// member order.
    pub fn search(&self, score: &Token) -> ScoreIter<'_> {
        ScoreIter {
            next: self.search_smallest_node(score),
            score: score.clone(),
            _marker: PhantomData,
        }
    }

    fn range_smallest_node(&self, range: &RangeSpec, found_exact: &mut bool) -> Link {
        unsafe {
            let first = (*self.header).forward[0];
            if first.is_null() {
                return ptr::null_mut();
            }
            // Probing `max` here is sound: when even the smallest score
            // exceeds the upper bound, nothing can qualify.
            if Token::cmp_opt((*first).score.as_ref(), Some(&range.max)) == Ordering::Greater {
                return ptr::null_mut();
            }

            let mut x = self.header;
            for i in (0..self.level).rev() {
                loop {
                    let next = (*x).forward[i];
                    if next.is_null() {
                        break;
                    }
                    match Token::cmp_opt((*next).score.as_ref(), Some(&range.min)) {
                        Ordering::Less => x = next,
                        Ordering::Equal => {
                            let mut x = next;
                            if !range.minex {
                                while !(*x).backward.is_null()
                                    && Token::cmp_opt(
                                        (*(*x).backward).score.as_ref(),
                                        Some(&range.min),
                                    ) == Ordering::Equal
                                {
                                    x = (*x).backward;
                                }
                            }
                            *found_exact = true;
                            return x;
                        }
                        Ordering::Greater => {
                            if i == 0 {
                                *found_exact = false;
                                return next;
                            }
                            break;
                        }
                    }
                }
            }
            ptr::null_mut()
        }
    }

    /// First node qualifying for the range, or null.
    fn range_low_end(&self, range: &RangeSpec) -> Link {
        let mut found_exact = false;
        let mut x = self.range_smallest_node(range, &mut found_exact);
        if range.minex && found_exact {
            // The landing node sits inside the excluded equal run; step past it.
            unsafe {
                while !x.is_null()
                    && Token::cmp_opt((*x).score.as_ref(), Some(&range.min)) == Ordering::Equal
                {
                    x = (*x).forward[0];
                }
            }
        }
        x
    }

    fn range_largest_node(&self, range: &RangeSpec, found_exact: &mut bool) -> Link {
        unsafe {
            if self.tail.is_null() {
                return ptr::null_mut();
            }
            if Token::cmp_opt((*self.tail).score.as_ref(), Some(&range.max)) == Ordering::Less {
                return self.tail;
            }

            let mut x = self.header;
            for i in (0..self.level).rev() {
                loop {
                    let next = (*x).forward[i];
                    if next.is_null() {
                        break;
                    }
                    match Token::cmp_opt((*next).score.as_ref(), Some(&range.max)) {
                        Ordering::Less => x = next,
                        Ordering::Equal if range.maxex => {
                            // The backward adjustment pass corrects this hit.
                            *found_exact = true;
                            return next;
                        }
                        Ordering::Equal => {
                            let two_ahead = (*next).forward[i];
                            if !two_ahead.is_null()
                                && Token::cmp_opt((*two_ahead).score.as_ref(), Some(&range.max))
                                    == Ordering::Equal
                            {
                                // Fast-forward through the equal run on this layer.
                                x = next;
                            } else if i == 0 {
                                *found_exact = true;
                                return next;
                            } else {
                                break;
                            }
                        }
                        Ordering::Greater => {
                            if i == 0 {
                                // The successor overshoots the bound; the last
                                // qualifying node is the one we stand on.
                                *found_exact = false;
                                return if x == self.header { ptr::null_mut() } else { x };
                            }
                            break;
                        }
                    }
                }
            }
            ptr::null_mut()
        }
    }

    /// Last node qualifying for the range, or null.
    fn range_high_end(&self, range: &RangeSpec) -> Link {
        let mut found_exact = false;
        let mut x = self.range_largest_node(range, &mut found_exact);
        if range.maxex && found_exact {
            unsafe {
                while !x.is_null()
                    && Token::cmp_opt((*x).score.as_ref(), Some(&range.max)) == Ordering::Equal
                {
                    x = (*x).backward;
                }
            }
        }
        x
    }

    /// Iterate the entries inside the range, in order.
    pub fn range(&self, range: &RangeSpec) -> RangeIter<'_> {
        let low = self.range_low_end(range);
        if low.is_null() {
            return RangeIter::empty();
        }
        let high = self.range_high_end(range);
        if high.is_null() {
            return RangeIter::empty();
        }
        // Exclusive bounds can collapse the interval: the resolved endpoints
        // cross and nothing qualifies.
        if unsafe { node_cmp(low, high) } == Ordering::Greater {
            return RangeIter::empty();
        }
        RangeIter {
            next: low,
            last: high,
            _marker: PhantomData,
        }
    }

    /// Layer-0 traversal of every entry in order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            next: unsafe { (*self.header).forward[0] },
            _marker: PhantomData,
        }
    }

    /// Approximate heap footprint, rounded to allocation size classes.
    pub fn mem_usage(&self) -> usize {
        let mut total = size_class(size_of::<SkipList>()) + node_heap_size(MAX_LEVEL);
        unsafe {
            let mut x = (*self.header).forward[0];
            while !x.is_null() {
                total += node_heap_size((*x).forward.len());
                let (score, member) = (*x).entry();
                total += size_class(score.as_bytes().len()) + size_class(member.as_bytes().len());
                x = (*x).forward[0];
            }
        }
        total
    }

    /// Walk the whole structure and assert every structural invariant:
    /// per-layer ordering, the backward mirror, tail, level, and length.
    pub fn validate_for_test(&self) {
        unsafe {
            for i in self.level..MAX_LEVEL {
                assert!(
                    (*self.header).forward[i].is_null(),
                    "header slot {i} above the list level must be empty",
                );
            }
            assert!(
                self.level == 1 || !(*self.header).forward[self.level - 1].is_null(),
                "list level must sit on the highest occupied header slot",
            );

            for i in 0..self.level {
                let mut x = (*self.header).forward[i];
                while !x.is_null() {
                    assert!((*x).forward.len() > i, "node linked above its own level");
                    let next = (*x).forward[i];
                    if !next.is_null() {
                        assert_ne!(
                            node_cmp(x, next),
                            Ordering::Greater,
                            "layer {i} order violated",
                        );
                    }
                    x = next;
                }
            }

            let mut count = 0;
            let mut prev: Link = ptr::null_mut();
            let mut x = (*self.header).forward[0];
            while !x.is_null() {
                assert_eq!((*x).backward, prev, "backward thread out of sync");
                assert!((*x).forward.len() <= MAX_LEVEL);
                count += 1;
                prev = x;
                x = (*x).forward[0];
            }
            assert_eq!(self.tail, prev, "tail must be the last layer-0 node");
            assert_eq!(self.length, count, "length must match the layer-0 chain");
        }
    }
}

unsafe fn node_cmp(a: Link, b: Link) -> Ordering {
    Token::cmp_opt((*a).score.as_ref(), (*b).score.as_ref()).then_with(|| {
        match ((*a).member.as_ref(), (*b).member.as_ref()) {
            (Some(x), Some(y)) => x.cmp_bytes(y),
            _ => Ordering::Equal,
        }
    })
}

impl Drop for SkipList {
    fn drop(&mut self) {
        unsafe {
            let mut x = (*self.header).forward[0];
            drop(Box::from_raw(self.header));
            while !x.is_null() {
                let next = (*x).forward[0];
                drop(Box::from_raw(x));
                x = next;
            }
        }
    }
}

#[inline]
const fn size_class(bytes: usize) -> usize {
    if bytes <= 512 {
        (bytes + 7) & !7
    } else {
        bytes.next_power_of_two()
    }
}

#[inline]
fn node_heap_size(level: usize) -> usize {
    size_class(size_of::<Node>()) + size_class(level * size_of::<Link>())
}

pub struct Iter<'a> {
    next: *const Node,
    _marker: PhantomData<&'a SkipList>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Token, &'a Token);

    fn next(&mut self) -> Option<Self::Item> {
        let node: &'a Node = unsafe { self.next.as_ref()? };
        self.next = node.forward[0];
        Some(node.entry())
    }
}

pub struct ScoreIter<'a> {
    next: *const Node,
    score: Token,
    _marker: PhantomData<&'a SkipList>,
}

impl<'a> Iterator for ScoreIter<'a> {
    type Item = (&'a Token, &'a Token);

    fn next(&mut self) -> Option<Self::Item> {
        let node: &'a Node = unsafe { self.next.as_ref()? };
        if Token::cmp_opt(node.score.as_ref(), Some(&self.score)) != Ordering::Equal {
            self.next = ptr::null();
            return None;
        }
        self.next = node.forward[0];
        Some(node.entry())
    }
}

pub struct RangeIter<'a> {
    next: *const Node,
    last: *const Node,
    _marker: PhantomData<&'a SkipList>,
}

impl RangeIter<'_> {
    fn empty() -> Self {
        RangeIter {
            next: ptr::null(),
            last: ptr::null(),
            _marker: PhantomData,
        }
    }
}

impl<'a> Iterator for RangeIter<'a> {
    type Item = (&'a Token, &'a Token);

    fn next(&mut self) -> Option<Self::Item> {
        let node: &'a Node = unsafe { self.next.as_ref()? };
        // The high end is emitted, then iteration stops.
        self.next = if ptr::eq(node, self.last) {
            ptr::null()
        } else {
            node.forward[0]
        };
        Some(node.entry())
    }
}
